//! Parseo heurístico del texto reconocido en tickets de taller
//!
//! Convierte el texto concatenado de todas las imágenes en un
//! `DraftCompletion`. Es una función pura: el mismo texto produce siempre el
//! mismo borrador. Las secciones que no aparecen quedan vacías y se completan
//! a mano.
//!
//! Reglas:
//! - Una cabecera es una línea que contiene sólo la etiqueta, o la etiqueta
//!   seguida de `:` y contenido en la misma línea.
//! - Una sección termina en la siguiente cabecera, en una línea de cierre
//!   (total, observaciones, firma...) o en la primera línea en blanco después
//!   de haber recogido contenido.
//! - El importe es el primer número acompañado de un token de moneda.

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::models::maintenance::{DraftCompletion, PartLabel, PartList};

/// Separador entre los textos de cada imagen
pub const IMAGE_TEXT_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Works,
    InteriorParts,
    ExteriorParts,
}

lazy_static! {
    static ref WORKS_HEADER: Regex = Regex::new(
        r"(?i)^\s*(?:[-*•]\s*)?(?:trabajos\s+realizados|trabajos\s+efectuados|trabajos|works\s+performed|work\s+performed|works)\s*(?::\s*(?P<rest>.*))?$"
    ).unwrap();

    static ref INTERIOR_HEADER: Regex = Regex::new(
        r"(?i)^\s*(?:[-*•]\s*)?(?:(?:repuestos|piezas|partes|recambios)\s+(?:del?\s+)?interior(?:es)?|interior\s+parts(?:\s+replaced)?|interior(?:es)?)\s*(?::\s*(?P<rest>.*))?$"
    ).unwrap();

    static ref EXTERIOR_HEADER: Regex = Regex::new(
        r"(?i)^\s*(?:[-*•]\s*)?(?:(?:repuestos|piezas|partes|recambios)\s+(?:del?\s+)?exterior(?:es)?|exterior\s+parts(?:\s+replaced)?|exterior(?:es)?)\s*(?::\s*(?P<rest>.*))?$"
    ).unwrap();

    // Líneas que cierran cualquier sección abierta
    static ref SECTION_TERMINATOR: Regex = Regex::new(
        r"(?i)^\s*(?:total|subtotal|importe|monto|observaciones|notas|notes|firma|signature|fecha|date|iva|vat)\b"
    ).unwrap();

    static ref BULLET_PREFIX: Regex = Regex::new(r"^\s*(?:[-*•·]|\d{1,2}[.)])\s+").unwrap();

    static ref PART_SEPARATOR: Regex = Regex::new(r"[,;]").unwrap();

    // Importe con moneda delante ("€ 45,50", "US$ 1,200.00", "S/. 80") o detrás ("45,50 €", "120 EUR")
    static ref CURRENCY_AMOUNT: Regex = Regex::new(
        r"(?i)(?:(?P<pre>€|US\$|\$|S/\.?|\b(?:USD|EUR|PEN|MXN|COP|ARS|CLP))\s*(?P<pre_amount>\d[\d.,]*\d|\d))|(?:(?P<post_amount>\d[\d.,]*\d|\d)\s*(?P<post>€|\b(?:USD|EUR|PEN|MXN|COP|ARS|CLP|euros?|soles|d[oó]lares)\b))"
    ).unwrap();
}

/// Concatenar los textos en orden de subida, separados por una línea en blanco
pub fn concatenate_texts<S: AsRef<str>>(texts: &[S]) -> String {
    texts
        .iter()
        .map(|t| t.as_ref().trim_end())
        .collect::<Vec<_>>()
        .join(IMAGE_TEXT_SEPARATOR)
}

/// Parsear el texto concatenado a un borrador de cierre
pub fn parse_structured_fields(text: &str) -> DraftCompletion {
    let mut works_lines: Vec<String> = Vec::new();
    let mut interior = PartList::new();
    let mut exterior = PartList::new();

    let mut current: Option<Section> = None;
    let mut collected_in_section = false;

    for line in text.lines() {
        if let Some((section, rest)) = match_header(line) {
            current = Some(section);
            collected_in_section = false;
            if let Some(rest) = rest {
                collected_in_section |=
                    push_content(section, rest, &mut works_lines, &mut interior, &mut exterior);
            }
            continue;
        }

        if SECTION_TERMINATOR.is_match(line) {
            current = None;
            continue;
        }

        if line.trim().is_empty() {
            if collected_in_section {
                current = None;
            }
            continue;
        }

        if let Some(section) = current {
            collected_in_section |=
                push_content(section, line, &mut works_lines, &mut interior, &mut exterior);
        }
    }

    let (total_cost, currency) = match find_total_cost(text) {
        Some((amount, currency)) => (Some(amount), currency),
        None => (None, None),
    };

    DraftCompletion {
        works_performed: works_lines.join("\n"),
        interior_parts_replaced: interior,
        exterior_parts_replaced: exterior,
        total_cost,
        currency,
    }
}

fn match_header(line: &str) -> Option<(Section, Option<&str>)> {
    let candidates: [(Section, &Regex); 3] = [
        (Section::Works, &*WORKS_HEADER),
        (Section::InteriorParts, &*INTERIOR_HEADER),
        (Section::ExteriorParts, &*EXTERIOR_HEADER),
    ];

    candidates.iter().find_map(|(section, regex)| {
        regex.captures(line).map(|caps| {
            let rest = caps
                .name("rest")
                .map(|m| m.as_str())
                .filter(|s| !s.trim().is_empty());
            (*section, rest)
        })
    })
}

// Devuelve true si se añadió algo
fn push_content(
    section: Section,
    raw: &str,
    works_lines: &mut Vec<String>,
    interior: &mut PartList,
    exterior: &mut PartList,
) -> bool {
    let content = strip_bullet(raw);
    if content.is_empty() {
        return false;
    }

    match section {
        Section::Works => {
            works_lines.push(content.to_string());
            true
        }
        Section::InteriorParts => push_parts(content, interior),
        Section::ExteriorParts => push_parts(content, exterior),
    }
}

fn push_parts(content: &str, list: &mut PartList) -> bool {
    let mut added = false;
    for piece in PART_SEPARATOR.split(content) {
        // Etiquetas inválidas (vacías o demasiado largas) se descartan
        if let Ok(label) = PartLabel::parse(strip_bullet(piece)) {
            list.push(label);
            added = true;
        }
    }
    added
}

fn strip_bullet(line: &str) -> &str {
    match BULLET_PREFIX.find(line) {
        Some(m) => line[m.end()..].trim(),
        None => line.trim(),
    }
}

/// Primer importe con token de moneda: (importe, código ISO si se pudo deducir)
pub fn find_total_cost(text: &str) -> Option<(Decimal, Option<String>)> {
    CURRENCY_AMOUNT.captures_iter(text).find_map(|caps| {
        let (amount, token) = match (caps.name("pre_amount"), caps.name("post_amount")) {
            (Some(amount), _) => (amount.as_str(), caps.name("pre")?.as_str()),
            (None, Some(amount)) => (amount.as_str(), caps.name("post")?.as_str()),
            (None, None) => return None,
        };
        let value = normalize_amount(amount)?;
        Some((value, currency_code(token)))
    })
}

/// Normalizar "1.234,56", "1,234.56", "45,50", "12.500" a decimal
pub fn normalize_amount(raw: &str) -> Option<Decimal> {
    let last_dot = raw.rfind('.');
    let last_comma = raw.rfind(',');

    let normalized = match (last_dot, last_comma) {
        (Some(dot), Some(comma)) => {
            if dot > comma {
                raw.replace(',', "")
            } else {
                raw.replace('.', "").replace(',', ".")
            }
        }
        (Some(_), None) => single_separator(raw, '.'),
        (None, Some(_)) => single_separator(raw, ','),
        (None, None) => raw.to_string(),
    };

    Decimal::from_str(&normalized).ok()
}

// Un único tipo de separador: decimal salvo que aparezca varias veces
// o vaya seguido exactamente de tres dígitos (separador de miles)
fn single_separator(raw: &str, separator: char) -> String {
    let occurrences = raw.matches(separator).count();
    let decimals = raw
        .rsplit(separator)
        .next()
        .map(|tail| tail.len())
        .unwrap_or(0);

    if occurrences > 1 || decimals == 3 {
        raw.replace(separator, "")
    } else {
        raw.replace(separator, ".")
    }
}

fn currency_code(token: &str) -> Option<String> {
    let code = match token.to_lowercase().as_str() {
        "€" | "eur" | "euro" | "euros" => "EUR",
        "us$" | "usd" | "dolares" | "dólares" => "USD",
        "s/" | "s/." | "pen" | "soles" => "PEN",
        "mxn" => "MXN",
        "cop" => "COP",
        "ars" => "ARS",
        "clp" => "CLP",
        // "$" a secas es ambiguo
        _ => return None,
    };
    Some(code.to_string())
}
