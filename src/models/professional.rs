use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Professional {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
}
