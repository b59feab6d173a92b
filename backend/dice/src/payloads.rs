//! JSON bodies shared by the server and the client.
//!
//! Request bodies keep every field optional so presence checks happen in the
//! handlers, which answer with a 400 instead of a deserialization failure.
use serde::{Deserialize, Serialize};

use crate::models::{NewQuickRoll, QuickRoll, QuickRollPatch, Roll};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateQuickRollBody {
    pub name: Option<String>,
    pub notation: Option<String>,
    pub category: Option<String>,
    pub color: Option<String>,
}

impl From<&NewQuickRoll> for CreateQuickRollBody {
    fn from(fields: &NewQuickRoll) -> Self {
        Self {
            name: Some(fields.name.clone()),
            notation: Some(fields.notation.clone()),
            category: Some(fields.category.unwrap_or_default().to_string()),
            color: Some(fields.color.unwrap_or_default().to_string()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateQuickRollBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
}

impl From<&QuickRollPatch> for UpdateQuickRollBody {
    fn from(patch: &QuickRollPatch) -> Self {
        Self {
            name: patch.name.clone(),
            notation: patch.notation.clone(),
            color: patch.color.map(|c| c.to_string()),
            category: patch.category.map(|c| c.to_string()),
            order: patch.order,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveRollBody {
    pub dados: Option<String>,
    pub resultados: Option<Vec<i64>>,
    pub total: Option<i64>,
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuickRollList {
    pub success: bool,
    pub data: Vec<QuickRoll>,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuickRollEnvelope {
    pub success: bool,
    pub data: QuickRoll,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub rolamentos: Vec<Roll>,
    pub count: usize,
    pub filter: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClearResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "deletedCount")]
    pub deleted_count: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub success: bool,
    pub store: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Color};

    #[test]
    fn test_create_body_fills_defaults() {
        let body = CreateQuickRollBody::from(&NewQuickRoll {
            name: "Fireball".to_string(),
            notation: "8d6".to_string(),
            color: None,
            category: Some(Category::Magic),
        });

        assert_eq!(body.color.as_deref(), Some("blue"));
        assert_eq!(body.category.as_deref(), Some("magic"));
    }

    #[test]
    fn test_update_body_omits_absent_fields() {
        let body = UpdateQuickRollBody::from(&QuickRollPatch {
            color: Some(Color::Green),
            ..Default::default()
        });

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({ "color": "green" })
        );
    }

    #[test]
    fn test_save_body_accepts_missing_fields() {
        let body: SaveRollBody = serde_json::from_str(r#"{ "dados": "2d6" }"#).unwrap();

        assert_eq!(body.dados.as_deref(), Some("2d6"));
        assert!(body.resultados.is_none());
        assert!(body.total.is_none());
    }
}
