use serde_json::{json, Map, Value};

/// The label table is keyed by the image identifier only.
pub const PARTITION_KEY_NAME: &str = "image";

const DEFAULT_READ_CAPACITY: u32 = 5;
const DEFAULT_WRITE_CAPACITY: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhysicalName {
    /// The deployment engine picks a unique name at creation time.
    Generated,
    Explicit(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub logical_name: String,
    pub physical_name: PhysicalName,
}

impl Bucket {
    pub fn new(logical_name: impl Into<String>, physical_name: PhysicalName) -> Self {
        Self {
            logical_name: logical_name.into(),
            physical_name,
        }
    }

    pub(crate) fn properties(&self) -> Value {
        let mut properties = Map::new();
        if let PhysicalName::Explicit(name) = &self.physical_name {
            properties.insert("BucketName".to_string(), Value::String(name.clone()));
        }
        Value::Object(properties)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    String,
    Number,
    Binary,
}

impl AttributeType {
    pub fn code(self) -> &'static str {
        match self {
            Self::String => "S",
            Self::Number => "N",
            Self::Binary => "B",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAttribute {
    pub name: String,
    pub attribute_type: AttributeType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub logical_name: String,
    pub physical_name: PhysicalName,
    pub partition_key: KeyAttribute,
    pub read_capacity: u32,
    pub write_capacity: u32,
}

impl Table {
    /// A label table: single string partition key, no sort key, no indexes.
    pub fn labels(logical_name: impl Into<String>) -> Self {
        Self {
            logical_name: logical_name.into(),
            physical_name: PhysicalName::Generated,
            partition_key: KeyAttribute {
                name: PARTITION_KEY_NAME.to_string(),
                attribute_type: AttributeType::String,
            },
            read_capacity: DEFAULT_READ_CAPACITY,
            write_capacity: DEFAULT_WRITE_CAPACITY,
        }
    }

    pub(crate) fn properties(&self) -> Value {
        let mut properties = json!({
            "KeySchema": [
                { "AttributeName": self.partition_key.name, "KeyType": "HASH" }
            ],
            "AttributeDefinitions": [
                {
                    "AttributeName": self.partition_key.name,
                    "AttributeType": self.partition_key.attribute_type.code(),
                }
            ],
            "ProvisionedThroughput": {
                "ReadCapacityUnits": self.read_capacity,
                "WriteCapacityUnits": self.write_capacity,
            },
        });
        if let (PhysicalName::Explicit(name), Some(object)) =
            (&self.physical_name, properties.as_object_mut())
        {
            object.insert("TableName".to_string(), Value::String(name.clone()));
        }
        properties
    }
}
