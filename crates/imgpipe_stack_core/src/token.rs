//! Late-bound template values.
//!
//! Physical names, ARNs and account ids are only known once the deployment
//! engine creates the resources, so the builder refers to them through
//! tokens that render as CloudFormation intrinsic functions.

use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PseudoParameter {
    AccountId,
    Partition,
}

impl PseudoParameter {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AccountId => "AWS::AccountId",
            Self::Partition => "AWS::Partition",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Token {
    Literal(String),
    /// `Ref` to a resource or parameter in the same template.
    Ref(String),
    GetAtt {
        logical_id: String,
        attribute: String,
    },
    Pseudo(PseudoParameter),
    /// `Fn::Join` with an empty delimiter.
    Join(Vec<Token>),
}

impl Token {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    pub fn reference(logical_id: impl Into<String>) -> Self {
        Self::Ref(logical_id.into())
    }

    pub fn get_att(logical_id: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::GetAtt {
            logical_id: logical_id.into(),
            attribute: attribute.into(),
        }
    }

    pub fn arn_of(logical_id: impl Into<String>) -> Self {
        Self::get_att(logical_id, "Arn")
    }

    pub fn join(parts: Vec<Token>) -> Self {
        Self::Join(parts)
    }

    /// `<arn>/*`, the object-level resource of a bucket.
    pub fn objects_of(bucket_arn: Token) -> Self {
        Self::Join(vec![bucket_arn, Self::literal("/*")])
    }

    pub fn is_empty_literal(&self) -> bool {
        matches!(self, Self::Literal(value) if value.trim().is_empty())
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Literal(value) => Value::String(value.clone()),
            Self::Ref(logical_id) => json!({ "Ref": logical_id }),
            Self::GetAtt {
                logical_id,
                attribute,
            } => json!({ "Fn::GetAtt": [logical_id, attribute] }),
            Self::Pseudo(parameter) => json!({ "Ref": parameter.as_str() }),
            Self::Join(parts) => {
                let rendered = parts.iter().map(Token::to_json).collect::<Vec<_>>();
                json!({ "Fn::Join": ["", rendered] })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_object_arn_as_join() {
        let token = Token::objects_of(Token::arn_of("ImageBucket1234ABCD"));
        assert_eq!(
            token.to_json(),
            json!({
                "Fn::Join": ["", [
                    {"Fn::GetAtt": ["ImageBucket1234ABCD", "Arn"]},
                    "/*"
                ]]
            })
        );
    }

    #[test]
    fn pseudo_parameters_render_as_plain_refs() {
        assert_eq!(
            Token::Pseudo(PseudoParameter::AccountId).to_json(),
            json!({"Ref": "AWS::AccountId"})
        );
    }
}
