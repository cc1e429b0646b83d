//! Small entity used by the engine's unit tests.

use serde::{Deserialize, Serialize};

use crate::Entity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub id: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WidgetData {
    pub name: String,
}

impl Entity for Widget {
    type Id = u32;
    type Data = WidgetData;

    const RESOURCE: &'static str = "widgets";

    fn id(&self) -> &u32 {
        &self.id
    }
}

pub fn widget(id: u32, name: &str) -> Widget {
    Widget {
        id,
        name: name.to_string(),
        note: None,
    }
}
