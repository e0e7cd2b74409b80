//! Routing and classification lookup tables, loaded once per process.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

// ── Catalog records ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardRoutingData {
    pub board_id: i64,
    #[serde(default)]
    pub board_name: String,
    #[serde(default)]
    pub rules: Option<Vec<String>>,
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
    #[serde(default)]
    pub tasks: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDefinition {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubTypeDefinition {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub type_association_ids: Vec<i64>,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardItem {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

/// Types, subtypes and items configured on one service board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSchema {
    pub board_id: i64,
    #[serde(default)]
    pub board_name: String,
    #[serde(default)]
    pub types: Vec<TypeDefinition>,
    #[serde(default)]
    pub sub_types: Vec<SubTypeDefinition>,
    #[serde(default)]
    pub board_items: Vec<BoardItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemDefinition {
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub item: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityDefinition {
    pub id: i64,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub definition: String,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub response_target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRule {
    pub keyword: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub subtype: String,
    pub priority: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecialRule {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub indicators: Vec<String>,
}

/// Keyword rules for the security board.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocBoardTsis {
    #[serde(default)]
    pub classification_rules: Vec<ClassificationRule>,
    #[serde(default)]
    pub special_rules: Option<BTreeMap<String, SpecialRule>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaCatalog {
    pub board_routing: Vec<BoardRoutingData>,
    pub board_schemas: Vec<BoardSchema>,
    pub item_definitions: Vec<ItemDefinition>,
    pub priority_definitions: Vec<PriorityDefinition>,
    pub soc_rules: SocBoardTsis,
}

impl SchemaCatalog {
    pub fn board_schema(&self, board_id: Option<i64>) -> Option<&BoardSchema> {
        let id = board_id?;
        self.board_schemas.iter().find(|b| b.board_id == id)
    }
}

// ── Sources ──────────────────────────────────────────────────────────────

pub const BOARD_ROUTING_FILE: &str = "board_routing.json";
pub const SERVICE_BOARD_TSIS_FILE: &str = "service_board_TSIs.json";
pub const ITEM_DEFINITIONS_FILE: &str = "item_definitions.json";
pub const PRIORITY_DEFINITIONS_FILE: &str = "priority_definitions.json";
pub const SOC_BOARD_TSIS_FILE: &str = "soc_board_TSIs.json";

const EMBEDDED: [(&str, &str); 5] = [
    (BOARD_ROUTING_FILE, include_str!("../../../data/board_routing.json")),
    (SERVICE_BOARD_TSIS_FILE, include_str!("../../../data/service_board_TSIs.json")),
    (ITEM_DEFINITIONS_FILE, include_str!("../../../data/item_definitions.json")),
    (PRIORITY_DEFINITIONS_FILE, include_str!("../../../data/priority_definitions.json")),
    (SOC_BOARD_TSIS_FILE, include_str!("../../../data/soc_board_TSIs.json")),
];

/// Where the lookup tables come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSource {
    /// Tables compiled into the binary.
    Embedded,
    /// A directory holding files with the embedded names.
    Directory(PathBuf),
}

impl SchemaSource {
    async fn read(&self, name: &str) -> Result<String> {
        match self {
            Self::Embedded => EMBEDDED
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, body)| body.to_string())
                .with_context(|| format!("embedded table not found: {name}")),
            Self::Directory(dir) => {
                let path = dir.join(name);
                tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("failed to read {}", path.display()))
            },
        }
    }

    async fn parse<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let body = self.read(name).await?;
        serde_json::from_str(&body).with_context(|| format!("failed to parse {name}"))
    }

    pub async fn load(&self) -> Result<SchemaCatalog> {
        Ok(SchemaCatalog {
            board_routing: self.parse(BOARD_ROUTING_FILE).await?,
            board_schemas: self.parse(SERVICE_BOARD_TSIS_FILE).await?,
            item_definitions: self.parse(ITEM_DEFINITIONS_FILE).await?,
            priority_definitions: self.parse(PRIORITY_DEFINITIONS_FILE).await?,
            soc_rules: self.parse(SOC_BOARD_TSIS_FILE).await?,
        })
    }
}

// ── Cache ────────────────────────────────────────────────────────────────

enum CacheState {
    Unloaded,
    Loaded(Arc<SchemaCatalog>),
}

/// Read-through cache over a [`SchemaSource`]. The first caller loads;
/// concurrent callers wait on the lock. A failed load leaves the cache
/// unloaded so the next call tries again.
pub struct SchemaCache {
    source: SchemaSource,
    state: Mutex<CacheState>,
}

impl SchemaCache {
    pub fn new(source: SchemaSource) -> Self {
        Self {
            source,
            state: Mutex::new(CacheState::Unloaded),
        }
    }

    pub fn embedded() -> Self {
        Self::new(SchemaSource::Embedded)
    }

    pub async fn catalog(&self) -> Result<Arc<SchemaCatalog>> {
        let mut state = self.state.lock().await;
        if let CacheState::Loaded(catalog) = &*state {
            return Ok(Arc::clone(catalog));
        }
        let catalog = Arc::new(self.source.load().await?);
        info!(
            boards = catalog.board_routing.len(),
            board_schemas = catalog.board_schemas.len(),
            priorities = catalog.priority_definitions.len(),
            "schema catalog loaded"
        );
        *state = CacheState::Loaded(Arc::clone(&catalog));
        Ok(catalog)
    }

    pub async fn is_loaded(&self) -> bool {
        matches!(*self.state.lock().await, CacheState::Loaded(_))
    }
}
