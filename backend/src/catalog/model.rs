use serde::{Deserialize, Serialize};

/// A catalog good with the stock it holds in each warehouse.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Good {
    pub id: i64,
    pub name: String,
    pub size: i64,
    #[serde(default)]
    pub warehouses: Vec<GoodStock>,
}

/// One warehouse's view of a good, as listed under [`Good::warehouses`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoodStock {
    pub warehouse_id: i64,
    pub name: String,
    pub is_available: bool,
    pub count: i64,
    pub reserved: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: i64,
    pub name: String,
    #[serde(default = "available")]
    pub is_available: bool,
    #[serde(default)]
    pub goods: Vec<WarehouseStock>,
}

/// One good's stock, as listed under [`Warehouse::goods`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseStock {
    pub id: i64,
    pub name: String,
    pub size: i64,
    pub count: i64,
    pub reserved: i64,
}

fn available() -> bool {
    true
}

impl Good {
    pub fn new(id: i64, name: impl Into<String>, size: i64) -> Self {
        Self {
            id,
            name: name.into(),
            size,
            warehouses: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.id > 0 && !self.name.is_empty() && self.size != 0
    }
}

impl Warehouse {
    pub fn new(id: i64, name: impl Into<String>, is_available: bool) -> Self {
        Self {
            id,
            name: name.into(),
            is_available,
            goods: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.id > 0 && !self.name.is_empty()
    }
}
