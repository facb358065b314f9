use serde::Deserialize;
use serde_json::{Map, Value};

/// Normalized reference entity: id, display name, everything else as
/// attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    pub id: u32,
    pub name: String,
    pub attrs: Map<String, Value>,
}

impl EntityRecord {
    /// Build from a JSON object, reading the numeric id from `id_field`.
    /// The id and name keys are not repeated in `attrs`.
    pub(crate) fn from_object(value: Value, id_field: &str) -> Option<Self> {
        let Value::Object(mut obj) = value else {
            return None;
        };
        let id = obj.get(id_field)?.as_u64().and_then(|v| u32::try_from(v).ok())?;
        let name = obj.remove("name")?.as_str()?.to_owned();
        obj.remove(id_field);
        obj.remove("id");
        Some(Self {
            id,
            name,
            attrs: obj,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemRecord {
    pub id: u32,
    pub name: String,
    pub rarity: String,
    pub kind: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceRecord {
    pub id: u32,
    pub buy_price: i64,
    pub buy_quantity: i64,
    pub sell_price: i64,
    pub sell_quantity: i64,
}

#[derive(Deserialize)]
pub(crate) struct WireItem {
    id: u32,
    name: String,
    rarity: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    icon: Option<String>,
}

impl From<WireItem> for ItemRecord {
    fn from(w: WireItem) -> Self {
        Self {
            id: w.id,
            name: w.name,
            rarity: w.rarity,
            kind: w.kind,
            icon: w.icon,
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct WireListing {
    quantity: i64,
    unit_price: i64,
}

#[derive(Deserialize)]
pub(crate) struct WirePrice {
    id: u32,
    #[serde(default)]
    buys: WireListing,
    #[serde(default)]
    sells: WireListing,
}

impl From<WirePrice> for PriceRecord {
    fn from(w: WirePrice) -> Self {
        Self {
            id: w.id,
            buy_price: w.buys.unit_price,
            buy_quantity: w.buys.quantity,
            sell_price: w.sells.unit_price,
            sell_quantity: w.sells.quantity,
        }
    }
}
