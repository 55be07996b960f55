//! Nutrient table
//!
//! Per-pound nutrition data for the products that can go into a mix.
//! Values come from USDA FoodData Central, one pound (453.6 g) of product.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard};

use serde::Serialize;
use thiserror::Error;

use crate::models::{NutrientProfile, NutrientProfileUpdate};

/// Errors reported by the guarded table mutators
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NutrientTableError {
    #[error("Product {0} already has nutrition data")]
    DuplicateCode(String),

    #[error("Product {0} has no nutrition data")]
    UnknownCode(String),
}

/// Anything that can resolve a product code to its nutrient profile
pub trait NutrientSource {
    fn lookup(&self, product_code: &str) -> Option<&NutrientProfile>;
}

/// Entry for populating product pickers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailableProduct {
    pub code: String,
    pub name: String,
    pub description: String,
}

/// Insertion-ordered table of nutrient profiles keyed by product code
#[derive(Debug, Clone, Default)]
pub struct NutrientTable {
    codes: Vec<String>,
    profiles: HashMap<String, Arc<NutrientProfile>>,
}

impl NutrientTable {
    /// An empty table
    pub fn empty() -> Self {
        Self::default()
    }

    /// The table preloaded with the built-in product data
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for (code, profile) in builtin_profiles() {
            // Built-in codes are distinct
            let _ = table.add(code, profile);
        }
        table
    }

    pub fn lookup(&self, product_code: &str) -> Option<&NutrientProfile> {
        self.profiles.get(product_code).map(|p| p.as_ref())
    }

    pub fn has(&self, product_code: &str) -> bool {
        self.profiles.contains_key(product_code)
    }

    /// Insert a new profile; existing codes are rejected untouched
    pub fn add(
        &mut self,
        product_code: &str,
        mut profile: NutrientProfile,
    ) -> Result<(), NutrientTableError> {
        if self.has(product_code) {
            tracing::warn!("Product {} already exists in the nutrient table", product_code);
            return Err(NutrientTableError::DuplicateCode(product_code.to_string()));
        }

        profile.normalize_tags();
        self.codes.push(product_code.to_string());
        self.profiles
            .insert(product_code.to_string(), Arc::new(profile));
        Ok(())
    }

    /// Replace the provided fields of an existing profile
    pub fn update(
        &mut self,
        product_code: &str,
        update: &NutrientProfileUpdate,
    ) -> Result<(), NutrientTableError> {
        let Some(current) = self.profiles.get(product_code) else {
            tracing::warn!("Product {} does not exist in the nutrient table", product_code);
            return Err(NutrientTableError::UnknownCode(product_code.to_string()));
        };

        // Swap the whole entry so readers never see a partial profile
        let merged = Arc::new(current.merged_with(update));
        self.profiles.insert(product_code.to_string(), merged);
        Ok(())
    }

    /// Products with nutrition data, in insertion order
    pub fn list_available(&self) -> Vec<AvailableProduct> {
        self.codes
            .iter()
            .filter_map(|code| {
                self.profiles.get(code).map(|p| AvailableProduct {
                    code: code.clone(),
                    name: p.name.clone(),
                    description: p.description.clone(),
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl NutrientSource for NutrientTable {
    fn lookup(&self, product_code: &str) -> Option<&NutrientProfile> {
        NutrientTable::lookup(self, product_code)
    }
}

impl NutrientSource for HashMap<String, NutrientProfile> {
    fn lookup(&self, product_code: &str) -> Option<&NutrientProfile> {
        self.get(product_code)
    }
}

/// Nutrient table shared across the service
///
/// Only `add` and `update` take the write lock.
#[derive(Debug, Clone, Default)]
pub struct SharedNutrientTable {
    inner: Arc<RwLock<NutrientTable>>,
}

impl SharedNutrientTable {
    pub fn new(table: NutrientTable) -> Self {
        Self {
            inner: Arc::new(RwLock::new(table)),
        }
    }

    /// Read access for lookups and aggregation
    pub fn read(&self) -> RwLockReadGuard<'_, NutrientTable> {
        // A poisoned lock still holds whole entries; keep serving them
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add(&self, product_code: &str, profile: NutrientProfile) -> Result<(), NutrientTableError> {
        let mut table = self.inner.write().unwrap_or_else(|e| e.into_inner());
        table.add(product_code, profile)
    }

    pub fn update(
        &self,
        product_code: &str,
        update: &NutrientProfileUpdate,
    ) -> Result<(), NutrientTableError> {
        let mut table = self.inner.write().unwrap_or_else(|e| e.into_inner());
        table.update(product_code, update)
    }
}

fn profile(
    name: &str,
    description: &str,
    values: [f64; 5],
    vitamins: [&str; 3],
    minerals: [&str; 3],
) -> NutrientProfile {
    let [calories, protein, fat, carbs, fiber] = values;
    NutrientProfile {
        name: name.to_string(),
        description: description.to_string(),
        calories,
        protein,
        fat,
        carbs,
        fiber,
        vitamins: vitamins.iter().map(|s| s.to_string()).collect(),
        minerals: minerals.iter().map(|s| s.to_string()).collect(),
    }
}

// [calories, protein, fat, carbs, fiber]
fn builtin_profiles() -> Vec<(&'static str, NutrientProfile)> {
    vec![
        ("A01", profile(
            "Almendras Premium",
            "Almendras crudas, ricas en vitamina E",
            [579.0, 21.2, 49.9, 21.6, 12.5],
            ["E", "B2", "Niacina"],
            ["Magnesio", "Calcio", "Hierro"],
        )),
        ("N01", profile(
            "Nueces de Castilla",
            "Nueces con alto contenido de ácidos grasos Omega-3",
            [654.0, 15.2, 65.2, 13.7, 6.7],
            ["E", "B6", "Folato"],
            ["Manganeso", "Cobre", "Magnesio"],
        )),
        ("P01", profile(
            "Pasas Sultan",
            "Pasas dulces, excelente fuente de energía",
            [299.0, 3.1, 0.5, 79.2, 3.7],
            ["K", "B6", "Tiamina"],
            ["Potasio", "Hierro", "Manganeso"],
        )),
        ("P02", profile(
            "Pistachos Tostados",
            "Pistachos tostados sin sal, proteína vegetal completa",
            [560.0, 20.2, 45.3, 27.2, 10.6],
            ["B6", "Tiamina", "E"],
            ["Cobre", "Manganeso", "Fósforo"],
        )),
        ("A02", profile(
            "Avellanas Enteras",
            "Avellanas premium, ricas en antioxidantes",
            [628.0, 14.9, 60.8, 16.7, 9.7],
            ["E", "B6", "Folato"],
            ["Manganeso", "Cobre", "Magnesio"],
        )),
        ("C01", profile(
            "Castañas de Cajú",
            "Anacardos tostados, ricos en minerales",
            [553.0, 18.2, 43.8, 30.2, 3.3],
            ["K", "B6", "Tiamina"],
            ["Cobre", "Magnesio", "Fósforo"],
        )),
        ("M01", profile(
            "Maní Tostado",
            "Cacahuates tostados, alta proteína",
            [567.0, 25.8, 49.2, 16.1, 8.5],
            ["E", "Niacina", "Folato"],
            ["Magnesio", "Fósforo", "Zinc"],
        )),
        ("D01", profile(
            "Dátiles Medjool",
            "Dátiles naturales, endulzante natural",
            [277.0, 1.8, 0.2, 75.0, 6.7],
            ["B6", "Niacina", "Ácido Pantoténico"],
            ["Potasio", "Magnesio", "Cobre"],
        )),
        ("S01", profile(
            "Semillas de Girasol",
            "Semillas peladas, ricas en vitamina E",
            [584.0, 20.8, 51.5, 20.0, 8.6],
            ["E", "B1", "B6"],
            ["Selenio", "Fósforo", "Magnesio"],
        )),
        ("S02", profile(
            "Semillas de Calabaza",
            "Pepitas verdes, alto contenido de zinc",
            [559.0, 30.2, 49.1, 10.7, 6.0],
            ["K", "E", "B2"],
            ["Zinc", "Magnesio", "Hierro"],
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cranberries() -> NutrientProfile {
        NutrientProfile {
            name: "Arándanos Deshidratados".to_string(),
            description: "Arándanos rojos".to_string(),
            calories: 308.0,
            protein: 0.2,
            fat: 1.1,
            carbs: 82.4,
            fiber: 5.3,
            vitamins: vec!["C".into(), "E".into(), "C".into()],
            minerals: vec!["Manganeso".into()],
        }
    }

    #[test]
    fn test_builtin_table_contents() {
        let table = NutrientTable::builtin();
        assert_eq!(table.len(), 10);
        assert!(table.has("A01"));
        assert!(!table.has("NOEXISTE"));
        assert_eq!(table.lookup("A01").map(|p| p.calories), Some(579.0));
        assert_eq!(table.lookup("P01").map(|p| p.calories), Some(299.0));
        assert!(table.lookup("NOEXISTE").is_none());
    }

    #[test]
    fn test_list_available_keeps_insertion_order() {
        let mut table = NutrientTable::builtin();
        table.add("Z99", cranberries()).unwrap();
        let codes: Vec<String> = table.list_available().into_iter().map(|p| p.code).collect();
        assert_eq!(codes.first().map(String::as_str), Some("A01"));
        assert_eq!(codes.get(1).map(String::as_str), Some("N01"));
        assert_eq!(codes.last().map(String::as_str), Some("Z99"));
    }

    #[test]
    fn test_add_then_lookup_returns_normalized_profile() {
        let mut table = NutrientTable::builtin();
        table.add("R01", cranberries()).unwrap();
        let stored = table.lookup("R01").unwrap();
        assert_eq!(stored.calories, 308.0);
        assert_eq!(stored.vitamins, vec!["C", "E"]);
    }

    #[test]
    fn test_add_existing_code_is_rejected() {
        let mut table = NutrientTable::builtin();
        let before = table.lookup("A01").cloned();
        let result = table.add("A01", cranberries());
        assert_eq!(result, Err(NutrientTableError::DuplicateCode("A01".to_string())));
        assert_eq!(table.lookup("A01").cloned(), before);
        assert_eq!(table.len(), 10);
    }

    #[test]
    fn test_update_unknown_code_is_rejected() {
        let mut table = NutrientTable::builtin();
        let update = NutrientProfileUpdate {
            calories: Some(1.0),
            ..Default::default()
        };
        let result = table.update("NOEXISTE", &update);
        assert_eq!(result, Err(NutrientTableError::UnknownCode("NOEXISTE".to_string())));
        assert!(!table.has("NOEXISTE"));
        assert_eq!(table.len(), 10);
    }

    #[test]
    fn test_update_replaces_fields() {
        let mut table = NutrientTable::builtin();
        let update = NutrientProfileUpdate {
            fiber: Some(13.0),
            minerals: Some(vec!["Calcio".to_string()]),
            ..Default::default()
        };
        table.update("A01", &update).unwrap();
        let stored = table.lookup("A01").unwrap();
        assert_eq!(stored.fiber, 13.0);
        assert_eq!(stored.calories, 579.0);
        assert_eq!(stored.minerals, vec!["Calcio"]);
    }

    #[test]
    fn test_shared_table_mutators() {
        let shared = SharedNutrientTable::new(NutrientTable::builtin());
        shared.add("R01", cranberries()).unwrap();
        assert!(shared.add("R01", cranberries()).is_err());
        assert!(shared.read().has("R01"));

        let clone = shared.clone();
        clone
            .update("R01", &NutrientProfileUpdate { protein: Some(0.5), ..Default::default() })
            .unwrap();
        assert_eq!(shared.read().lookup("R01").map(|p| p.protein), Some(0.5));
    }
}
