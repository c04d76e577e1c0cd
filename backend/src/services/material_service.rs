//! Warehouse material service.

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::material::{Material, MaterialChanges, NewMaterial};
use crate::store::Store;

pub const DEFAULT_UNIT: &str = "pcs";

#[derive(Debug, Clone, Default)]
pub struct CreateMaterial {
    pub name: String,
    pub description: Option<String>,
    pub quantity: Option<i32>,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateMaterial {
    pub name: Option<String>,
    /// Absent keeps the description, `Some(None)` or a blank string clears it
    pub description: Option<Option<String>>,
    pub quantity: Option<i32>,
    pub unit: Option<String>,
}

/// Material service
pub struct MaterialService {
    store: Arc<dyn Store>,
}

impl MaterialService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<Material>> {
        self.store.list_materials().await
    }

    pub async fn get(&self, id: i64) -> Result<Material> {
        self.store
            .get_material(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Material {} not found", id)))
    }

    pub async fn create(&self, input: CreateMaterial) -> Result<Material> {
        let quantity = input.quantity.unwrap_or(0);
        validate_quantity(quantity)?;

        let material = self
            .store
            .insert_material(NewMaterial {
                name: validate_name(&input.name)?,
                description: input.description.filter(|d| !d.trim().is_empty()),
                quantity,
                unit: input
                    .unit
                    .map(|u| u.trim().to_string())
                    .filter(|u| !u.is_empty())
                    .unwrap_or_else(|| DEFAULT_UNIT.to_string()),
            })
            .await?;

        tracing::info!(material_id = material.id, "Material created");
        Ok(material)
    }

    pub async fn update(&self, id: i64, input: UpdateMaterial) -> Result<Material> {
        if let Some(quantity) = input.quantity {
            validate_quantity(quantity)?;
        }
        let changes = MaterialChanges {
            name: input.name.as_deref().map(validate_name).transpose()?,
            description: input
                .description
                .map(|d| d.filter(|d| !d.trim().is_empty())),
            quantity: input.quantity,
            unit: input
                .unit
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty()),
        };

        let material = self
            .store
            .update_material(id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Material {} not found", id)))?;

        tracing::info!(material_id = id, "Material updated");
        Ok(material)
    }

    /// Delete a material. Tasks that referenced it keep existing without one.
    pub async fn delete(&self, id: i64) -> Result<()> {
        if !self.store.delete_material(id).await? {
            return Err(AppError::NotFound(format!("Material {} not found", id)));
        }
        tracing::info!(material_id = id, "Material deleted");
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Material name is required".into()));
    }
    Ok(name.to_string())
}

fn validate_quantity(quantity: i32) -> Result<()> {
    if quantity < 0 {
        return Err(AppError::Validation("Quantity cannot be negative".into()));
    }
    Ok(())
}
