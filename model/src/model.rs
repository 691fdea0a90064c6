use serde::Serialize;

// Document model handed to the renderer.
// - One FileRecord per documented .proto file.
// - Nested messages and enums are flattened into the file lists; nesting
//   shows up only in `long_name`.
// - Field names double as template keys, so keep them stable.

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FileRecord {
    pub name: String,
    pub description: String,
    pub package: String,
    pub messages: Vec<MessageRecord>,
    pub enums: Vec<EnumRecord>,
    pub services: Vec<ServiceRecord>,
    pub extensions: Vec<ExtensionRecord>,
    pub has_services: bool,
    pub has_extensions: bool,
}

// ---------------- Message & Fields ----------------

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MessageRecord {
    pub name: String,
    pub long_name: String,
    pub full_name: String,
    pub description: String,
    pub fields: Vec<FieldRecord>,
    pub extensions: Vec<ExtensionRecord>,
    pub has_fields: bool,
    pub has_extensions: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FieldRecord {
    pub name: String,
    pub description: String,
    pub label: String,
    pub number: i32,
    #[serde(rename = "type")]
    pub ty: String,
    pub long_type: String,
    pub full_type: String,
    pub default_value: String,
}

/// Short, long and fully-qualified spelling of a referenced type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeNames {
    pub name: String,
    pub long_name: String,
    pub full_name: String,
}

impl TypeNames {
    /// Scalars have a single spelling used for all three slots.
    pub fn scalar(keyword: &str) -> Self {
        Self {
            name: keyword.to_string(),
            long_name: keyword.to_string(),
            full_name: keyword.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ExtensionRecord {
    pub name: String,
    pub long_name: String,
    pub full_name: String,
    pub description: String,
    pub label: String,
    pub number: i32,
    #[serde(rename = "type")]
    pub ty: String,
    pub long_type: String,
    pub full_type: String,
    pub default_value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_long_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_full_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub containing_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub containing_long_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub containing_full_type: Option<String>,
}

impl ExtensionRecord {
    pub(crate) fn set_scope(&mut self, scope: TypeNames) {
        self.scope_type = Some(scope.name);
        self.scope_long_type = Some(scope.long_name);
        self.scope_full_type = Some(scope.full_name);
    }

    pub(crate) fn set_containing(&mut self, containing: TypeNames) {
        self.containing_type = Some(containing.name);
        self.containing_long_type = Some(containing.long_name);
        self.containing_full_type = Some(containing.full_name);
    }
}

// ---------------- Enum ----------------

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct EnumRecord {
    pub name: String,
    pub long_name: String,
    pub full_name: String,
    pub description: String,
    pub values: Vec<EnumValueRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumValueRecord {
    pub name: String,
    pub number: i32,
    pub description: String,
}

// ---------------- Service ----------------

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ServiceRecord {
    pub name: String,
    pub full_name: String,
    pub description: String,
    pub methods: Vec<MethodRecord>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MethodRecord {
    pub name: String,
    pub description: String,
    pub request_type: String,
    pub request_long_type: String,
    pub request_full_type: String,
    pub response_type: String,
    pub response_long_type: String,
    pub response_full_type: String,
    pub client_streaming: bool,
    pub server_streaming: bool,
}
