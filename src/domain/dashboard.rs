use serde::{Deserialize, Serialize};

fn one() -> u32 {
    1
}

/// Column header of the dashboard grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardColumn {
    pub header: String,
    #[serde(default = "one")]
    pub span: u32,
}

/// One cell of the dashboard grid, pointing at a subject by short name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardCell {
    pub subject: String,
    pub color: String,
    #[serde(default = "one")]
    pub column_span: u32,
    #[serde(default = "one")]
    pub row_span: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    #[serde(default)]
    pub columns: Vec<DashboardColumn>,
    #[serde(default)]
    pub rows: Vec<Vec<DashboardCell>>,
}

impl Dashboard {
    pub fn cells(&self) -> impl Iterator<Item = &DashboardCell> {
        self.rows.iter().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Vec::is_empty)
    }
}
