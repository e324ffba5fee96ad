//! Job, job document and component model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::{LineageError, Result};

/// Parameter holding a component's identifier
pub const UNIQUE_NAME: &str = "UNIQUE_NAME";
/// Parameter holding an output component's schema
pub const SCHEMA_DB: &str = "SCHEMA_DB";
/// Field type of a component's SQL text parameter
pub const MEMO_SQL: &str = "MEMO_SQL";

/// One version of a data-integration job
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Job {
    pub name: String,
    pub version: String,
    /// Where the job document lives
    pub location: PathBuf,
}

impl Job {
    pub fn new(name: impl Into<String>, version: impl Into<String>, location: PathBuf) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            location,
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.name, self.version)
    }
}

/// A job-scoped name/value binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextParameter {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// A named/field/value triple on a component node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementParameter {
    pub name: String,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub value: String,
}

/// A component node as stored in the job document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentNode {
    pub component_name: String,
    #[serde(default)]
    pub parameters: Vec<ElementParameter>,
}

impl ComponentNode {
    /// Value of the first parameter called `name`
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }

    /// Value of the first parameter whose field type is `field`
    pub fn field(&self, field: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.field == field)
            .map(|p| p.value.as_str())
    }

    /// Value of the first parameter with a table field type (`TABLE`, `DBTABLE`, ...)
    pub fn table_field(&self) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.field.contains("TABLE"))
            .map(|p| p.value.as_str())
    }

    pub fn kind(&self) -> Option<ComponentKind> {
        ComponentKind::from_component_name(&self.component_name)
    }
}

/// A parsed job document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDocument {
    #[serde(default)]
    pub context: Vec<ContextParameter>,
    #[serde(default)]
    pub components: Vec<ComponentNode>,
}

/// SQL-bearing component kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Input,
    Row,
    Output,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 3] = [ComponentKind::Output, ComponentKind::Input, ComponentKind::Row];

    /// Kind implied by a component name such as `tMysqlOutput` or `tDBRow`
    pub fn from_component_name(name: &str) -> Option<Self> {
        if name.contains("Output") {
            Some(ComponentKind::Output)
        } else if name.contains("Input") {
            Some(ComponentKind::Input)
        } else if name.contains("Row") {
            Some(ComponentKind::Row)
        } else {
            None
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentKind::Input => write!(f, "Input"),
            ComponentKind::Row => write!(f, "Row"),
            ComponentKind::Output => write!(f, "Output"),
        }
    }
}

/// Typed view over a component node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
    /// Writes to a table named by its parameters
    Output {
        id: String,
        table: Option<String>,
        schema: Option<String>,
    },
    /// Runs SQL; `Input` and `Row` components
    Query { id: String, sql: Option<String> },
}

impl Component {
    /// Build the typed view, requiring `UNIQUE_NAME`
    pub fn from_node(node: &ComponentNode) -> Result<Self> {
        let id = node
            .attribute(UNIQUE_NAME)
            .map(str::to_string)
            .ok_or_else(|| LineageError::MissingParameter {
                component: node.component_name.clone(),
                parameter: UNIQUE_NAME.to_string(),
            })?;

        let component = match node.kind() {
            Some(ComponentKind::Output) => Component::Output {
                id,
                table: node.table_field().map(str::to_string),
                schema: node.attribute(SCHEMA_DB).map(str::to_string),
            },
            _ => Component::Query {
                id,
                sql: node.field(MEMO_SQL).map(str::to_string),
            },
        };
        Ok(component)
    }

    pub fn id(&self) -> &str {
        match self {
            Component::Output { id, .. } | Component::Query { id, .. } => id,
        }
    }
}
