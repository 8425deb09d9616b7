//! Module catalog — read-only registry of module definitions.
//!
//! Catalog entries are reference data shared by every layout. A layout
//! never mutates a definition, only references it by type. The catalog
//! is constructed explicitly and passed by reference into the generator
//! and optimizer — there is no process-wide registry.

use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, LayoutResult};
use crate::geometry::Vec3;

/// Functional module types available to a habitat layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleType {
    SleepQuarter,
    Galley,
    Laboratory,
    Airlock,
    Mechanical,
    Medical,
    Exercise,
    Storage,
}

impl ModuleType {
    pub const ALL: [ModuleType; 8] = [
        ModuleType::SleepQuarter,
        ModuleType::Galley,
        ModuleType::Laboratory,
        ModuleType::Airlock,
        ModuleType::Mechanical,
        ModuleType::Medical,
        ModuleType::Exercise,
        ModuleType::Storage,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ModuleType::SleepQuarter => "sleep quarter",
            ModuleType::Galley => "galley",
            ModuleType::Laboratory => "laboratory",
            ModuleType::Airlock => "airlock",
            ModuleType::Mechanical => "mechanical",
            ModuleType::Medical => "medical",
            ModuleType::Exercise => "exercise",
            ModuleType::Storage => "storage",
        }
    }
}

/// Full x/y/z extents of a module's bounding box, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBoxDims {
    pub x_m: f32,
    pub y_m: f32,
    pub z_m: f32,
}

impl BBoxDims {
    pub fn new(x_m: f32, y_m: f32, z_m: f32) -> Self {
        Self { x_m, y_m, z_m }
    }

    pub fn volume_m3(&self) -> f32 {
        self.x_m * self.y_m * self.z_m
    }

    pub fn as_vec3(&self) -> Vec3 {
        Vec3::new(self.x_m, self.y_m, self.z_m)
    }
}

/// Physical and adjacency specification of one module kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDefinition {
    /// Catalog ID, unique within the catalog.
    pub id: String,
    pub module_type: ModuleType,
    pub bbox: BBoxDims,
    pub mass_kg: f32,
    pub power_w: f32,
    pub stowage_m3: f32,
    /// Named connectivity ports.
    pub ports: Vec<String>,
    /// Module types this one prefers to sit near.
    pub preferred_adjacent: Vec<ModuleType>,
    /// Module types this one must keep distance from.
    pub restricted_adjacent: Vec<ModuleType>,
}

impl ModuleDefinition {
    pub fn volume_m3(&self) -> f32 {
        self.bbox.volume_m3()
    }
}

/// Read-only module catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleCatalog {
    modules: Vec<ModuleDefinition>,
}

impl ModuleCatalog {
    pub fn new(modules: Vec<ModuleDefinition>) -> Self {
        Self { modules }
    }

    /// All definitions, in catalog order.
    pub fn all_modules(&self) -> &[ModuleDefinition] {
        &self.modules
    }

    /// All definitions of a given type, in catalog order.
    pub fn modules_by_type(&self, module_type: ModuleType) -> Vec<&ModuleDefinition> {
        self.modules
            .iter()
            .filter(|m| m.module_type == module_type)
            .collect()
    }

    /// First definition of a given type, if any.
    pub fn definition_for(&self, module_type: ModuleType) -> Option<&ModuleDefinition> {
        self.modules.iter().find(|m| m.module_type == module_type)
    }

    /// First definition of a given type, or a configuration error.
    pub fn require_type(&self, module_type: ModuleType) -> LayoutResult<&ModuleDefinition> {
        self.definition_for(module_type)
            .ok_or(LayoutError::EmptyCatalog(module_type))
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Standard catalog with one definition per module type.
    ///
    /// Footprints and resource costs follow deep-space habitat sizing:
    /// ~2m-class pressurized elements, masses in the 0.6–2.2 t range.
    pub fn standard() -> Self {
        let modules = vec![
            ModuleDefinition {
                id: "std_sleep_quarter".to_string(),
                module_type: ModuleType::SleepQuarter,
                bbox: BBoxDims::new(2.0, 2.0, 2.2),
                mass_kg: 800.0,
                power_w: 150.0,
                stowage_m3: 1.2,
                ports: vec!["hatch_a".to_string()],
                preferred_adjacent: vec![ModuleType::SleepQuarter, ModuleType::Medical],
                restricted_adjacent: vec![ModuleType::Mechanical, ModuleType::Exercise],
            },
            ModuleDefinition {
                id: "std_galley".to_string(),
                module_type: ModuleType::Galley,
                bbox: BBoxDims::new(3.0, 2.5, 2.2),
                mass_kg: 1400.0,
                power_w: 1800.0,
                stowage_m3: 3.5,
                ports: vec!["hatch_a".to_string(), "hatch_b".to_string()],
                preferred_adjacent: vec![ModuleType::Storage],
                restricted_adjacent: vec![ModuleType::Medical, ModuleType::Laboratory],
            },
            ModuleDefinition {
                id: "std_laboratory".to_string(),
                module_type: ModuleType::Laboratory,
                bbox: BBoxDims::new(3.5, 2.5, 2.2),
                mass_kg: 1800.0,
                power_w: 1200.0,
                stowage_m3: 2.0,
                ports: vec!["hatch_a".to_string(), "hatch_b".to_string()],
                preferred_adjacent: vec![ModuleType::Medical, ModuleType::Storage],
                restricted_adjacent: vec![ModuleType::Galley, ModuleType::Exercise],
            },
            ModuleDefinition {
                id: "std_airlock".to_string(),
                module_type: ModuleType::Airlock,
                bbox: BBoxDims::new(2.0, 1.5, 2.2),
                mass_kg: 1200.0,
                power_w: 300.0,
                stowage_m3: 0.5,
                ports: vec!["hatch_inner".to_string(), "hatch_outer".to_string()],
                preferred_adjacent: vec![],
                restricted_adjacent: vec![],
            },
            ModuleDefinition {
                id: "std_mechanical".to_string(),
                module_type: ModuleType::Mechanical,
                bbox: BBoxDims::new(2.5, 2.0, 2.2),
                mass_kg: 2200.0,
                power_w: 900.0,
                stowage_m3: 0.8,
                ports: vec!["hatch_a".to_string()],
                preferred_adjacent: vec![ModuleType::Storage],
                restricted_adjacent: vec![ModuleType::SleepQuarter, ModuleType::Medical],
            },
            ModuleDefinition {
                id: "std_medical".to_string(),
                module_type: ModuleType::Medical,
                bbox: BBoxDims::new(2.5, 2.0, 2.2),
                mass_kg: 1100.0,
                power_w: 600.0,
                stowage_m3: 1.5,
                ports: vec!["hatch_a".to_string()],
                preferred_adjacent: vec![ModuleType::SleepQuarter],
                restricted_adjacent: vec![ModuleType::Mechanical, ModuleType::Galley],
            },
            ModuleDefinition {
                id: "std_exercise".to_string(),
                module_type: ModuleType::Exercise,
                bbox: BBoxDims::new(2.5, 2.5, 2.2),
                mass_kg: 1000.0,
                power_w: 800.0,
                stowage_m3: 0.6,
                ports: vec!["hatch_a".to_string()],
                preferred_adjacent: vec![],
                restricted_adjacent: vec![ModuleType::SleepQuarter, ModuleType::Medical],
            },
            ModuleDefinition {
                id: "std_storage".to_string(),
                module_type: ModuleType::Storage,
                bbox: BBoxDims::new(2.0, 2.0, 2.2),
                mass_kg: 600.0,
                power_w: 100.0,
                stowage_m3: 6.0,
                ports: vec!["hatch_a".to_string()],
                preferred_adjacent: vec![ModuleType::Galley],
                restricted_adjacent: vec![],
            },
        ];
        Self { modules }
    }
}
