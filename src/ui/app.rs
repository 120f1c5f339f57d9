use crate::models::{CadencePreset, ProductUsage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Estimator,
    Confirm(ConfirmAction),
    ErrorDialog,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmAction {
    Quit,
    RemoveProduct { id: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Cadence,
    CustomUnits,
    ConsultingHours,
}

/// One editable product row; text fields hold what the user typed.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub id: u64,
    pub name: String,
    pub cadence: CadencePreset,
    pub custom_units: String,
}

impl ProductDraft {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            name: String::new(),
            cadence: CadencePreset::WeeklyOnce,
            custom_units: "0".into(),
        }
    }

    pub fn to_usage(&self) -> ProductUsage {
        ProductUsage {
            id: self.id,
            name: self.name.clone(),
            cadence: self.cadence,
            custom_annual_units: parse_number(&self.custom_units),
        }
    }
}

/// Blank or unparsable input reads as zero.
pub fn parse_number(raw: &str) -> f64 {
    raw.trim().parse::<f64>().unwrap_or(0.0)
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub running: bool,
    pub status: String,
    pub screen: Screen,
    pub previous_screen: Screen,
    pub products: Vec<ProductDraft>,
    pub next_id: u64,
    pub selected: usize,
    pub field: Field,
    pub consulting_input: String,
    pub confirm_selected: usize,
    pub error_message: String,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            running: true,
            status: "ready".into(),
            screen: Screen::Estimator,
            previous_screen: Screen::Estimator,
            products: vec![ProductDraft::new(1)],
            next_id: 2,
            selected: 0,
            field: Field::Cadence,
            consulting_input: "0".into(),
            confirm_selected: 0,
            error_message: String::new(),
        }
    }
}

impl AppState {
    /// Immutable inputs for one estimate pass.
    pub fn snapshot(&self) -> (Vec<ProductUsage>, f64) {
        let products = self.products.iter().map(ProductDraft::to_usage).collect();
        (products, parse_number(&self.consulting_input))
    }

    pub fn selected_product(&self) -> Option<&ProductDraft> {
        self.products.get(self.selected)
    }

    pub fn selected_product_mut(&mut self) -> Option<&mut ProductDraft> {
        self.products.get_mut(self.selected)
    }

    pub fn add_product(&mut self) {
        self.products.push(ProductDraft::new(self.next_id));
        self.next_id += 1;
        self.selected = self.products.len() - 1;
        if self.field == Field::ConsultingHours {
            self.field = Field::Cadence;
        }
    }

    pub fn remove_product(&mut self, id: u64) -> bool {
        let before = self.products.len();
        self.products.retain(|p| p.id != id);
        if self.selected >= self.products.len() {
            self.selected = self.products.len().saturating_sub(1);
        }
        if self.products.is_empty() {
            self.field = Field::ConsultingHours;
        }
        self.products.len() != before
    }

    /// Fields reachable with Tab from the current row, in order.
    pub fn visible_fields(&self) -> Vec<Field> {
        let mut fields = Vec::new();
        if let Some(product) = self.selected_product() {
            fields.push(Field::Name);
            fields.push(Field::Cadence);
            if product.cadence == CadencePreset::Custom {
                fields.push(Field::CustomUnits);
            }
        }
        fields.push(Field::ConsultingHours);
        fields
    }

    pub fn next_field(&mut self) {
        let fields = self.visible_fields();
        let idx = fields.iter().position(|f| *f == self.field).unwrap_or(0);
        self.field = fields[(idx + 1) % fields.len()];
    }

    pub fn previous_field(&mut self) {
        let fields = self.visible_fields();
        let idx = fields.iter().position(|f| *f == self.field).unwrap_or(0);
        self.field = fields[(idx + fields.len() - 1) % fields.len()];
    }

    /// Moves focus off fields the current row no longer shows.
    pub fn settle_field(&mut self) {
        if !self.visible_fields().contains(&self.field) {
            self.field = if self.products.is_empty() {
                Field::ConsultingHours
            } else {
                Field::Cadence
            };
        }
    }
}
