//! Utilidades de validación
//!
//! Este módulo contiene funciones helper para validación de datos
//! y conversión de tipos.

use validator::ValidationError;

/// Validar que un string no esté vacío
pub fn validate_not_empty(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("not_empty");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar longitud mínima y máxima
pub fn validate_length(value: &str, min: usize, max: usize) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len < min || len > max {
        let mut error = ValidationError::new("length");
        error.add_param("min".into(), &min);
        error.add_param("max".into(), &max);
        error.add_param("actual".into(), &len);
        return Err(error);
    }
    Ok(())
}

/// Validar que el content-type corresponda a una imagen
pub fn validate_image_content_type(value: &str) -> Result<(), ValidationError> {
    if !value.trim().to_ascii_lowercase().starts_with("image/") {
        let mut error = ValidationError::new("content_type");
        error.add_param("value".into(), &value.to_string());
        error.add_param("expected".into(), &"image/*".to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar código de moneda ISO 4217 (tres letras)
pub fn validate_currency(value: &str) -> Result<(), ValidationError> {
    if value.len() != 3 || !value.chars().all(|c| c.is_ascii_uppercase()) {
        let mut error = ValidationError::new("currency");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}
