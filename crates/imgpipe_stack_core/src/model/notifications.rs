use serde_json::{json, Value};

use crate::token::{PseudoParameter, Token};

pub const OBJECT_CREATED_EVENT: &str = "s3:ObjectCreated:*";
pub const S3_SERVICE_PRINCIPAL: &str = "s3.amazonaws.com";

/// Source of the custom resource handler that writes a bucket's
/// notification configuration. Buckets with generated names cannot carry
/// the configuration inline without a dependency cycle on the invoke
/// permission.
pub const NOTIFICATIONS_HANDLER_SOURCE: &str = r#"import json
import urllib.request

import boto3

s3 = boto3.client("s3")


def handler(event, context):
    status = "SUCCESS"
    reason = "See the details in CloudWatch Log Stream: " + context.log_stream_name
    try:
        props = event["ResourceProperties"]
        config = props["NotificationConfiguration"]
        if event["RequestType"] == "Delete":
            config = {}
        s3.put_bucket_notification_configuration(
            Bucket=props["BucketName"], NotificationConfiguration=config
        )
    except Exception as error:
        status = "FAILED"
        reason = str(error)
    body = json.dumps({
        "Status": status,
        "Reason": reason,
        "PhysicalResourceId": event.get("PhysicalResourceId") or context.log_stream_name,
        "StackId": event["StackId"],
        "RequestId": event["RequestId"],
        "LogicalResourceId": event["LogicalResourceId"],
    }).encode("utf-8")
    request = urllib.request.Request(event["ResponseURL"], data=body, method="PUT")
    request.add_header("Content-Type", "")
    urllib.request.urlopen(request)
"#;

/// Lets the storage service invoke a function for one source bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokePermission {
    pub function: String,
    pub source_bucket: String,
}

impl InvokePermission {
    pub(crate) fn properties(&self) -> Value {
        json!({
            "Action": "lambda:InvokeFunction",
            "FunctionName": Token::arn_of(&self.function).to_json(),
            "Principal": S3_SERVICE_PRINCIPAL,
            "SourceAccount": Token::Pseudo(PseudoParameter::AccountId).to_json(),
            "SourceArn": Token::arn_of(&self.source_bucket).to_json(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSubscription {
    pub source_bucket: String,
    pub events: Vec<String>,
    pub target_function: String,
}

impl EventSubscription {
    pub fn object_created(source_bucket: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source_bucket: source_bucket.into(),
            events: vec![OBJECT_CREATED_EVENT.to_string()],
            target_function: target.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketNotifications {
    /// Logical id of the handler function backing the custom resource.
    pub handler: String,
    pub bucket: String,
    pub subscriptions: Vec<EventSubscription>,
}

impl BucketNotifications {
    pub(crate) fn properties(&self) -> Value {
        let configurations = self
            .subscriptions
            .iter()
            .map(|subscription| {
                json!({
                    "Events": subscription.events,
                    "LambdaFunctionArn": Token::arn_of(&subscription.target_function).to_json(),
                })
            })
            .collect::<Vec<_>>();

        json!({
            "ServiceToken": Token::arn_of(&self.handler).to_json(),
            "BucketName": Token::reference(&self.bucket).to_json(),
            "NotificationConfiguration": {
                "LambdaFunctionConfigurations": configurations,
            },
        })
    }
}
