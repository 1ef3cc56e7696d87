//! Freight rules, tracking codes and Brazilian state names.
use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{AccountKind, Centavos};

/// Individual orders at or above this subtotal ship for free.
pub const FREE_SHIPPING_THRESHOLD: Centavos = Centavos::from_reais(100);
/// Own-fleet delivery within São Paulo.
pub const LOCAL_DELIVERY_COST: Centavos = Centavos::from_reais(15);
/// Postal delivery to the rest of the country.
pub const POSTAL_DELIVERY_COST: Centavos = Centavos::from_reais(25);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreightType {
    Gratis,
    Empresa,
    Correios,
    TransportadoraCliente,
}

impl Display for FreightType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FreightType::Gratis => "gratis",
            FreightType::Empresa => "empresa",
            FreightType::Correios => "correios",
            FreightType::TransportadoraCliente => "transportadora_cliente",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Freight {
    pub freight_type: FreightType,
    pub cost: Centavos,
}

impl Freight {
    pub fn new(freight_type: FreightType, cost: Centavos) -> Self {
        Self { freight_type, cost }
    }
}

/// Works out the freight for an order.
///
/// * Individuals (PF): free from [`FREE_SHIPPING_THRESHOLD`], otherwise own delivery inside São Paulo or post.
/// * Companies (PJ): own delivery inside São Paulo at no cost, otherwise the customer's own carrier picks up.
pub fn calculate_freight(account: AccountKind, subtotal: Centavos, state: &str) -> Freight {
    let local = is_sao_paulo(state);
    match account {
        AccountKind::PF if subtotal >= FREE_SHIPPING_THRESHOLD => Freight::new(FreightType::Gratis, Centavos::from(0)),
        AccountKind::PF if local => Freight::new(FreightType::Empresa, LOCAL_DELIVERY_COST),
        AccountKind::PF => Freight::new(FreightType::Correios, POSTAL_DELIVERY_COST),
        AccountKind::PJ if local => Freight::new(FreightType::Empresa, Centavos::from(0)),
        AccountKind::PJ => Freight::new(FreightType::TransportadoraCliente, Centavos::from(0)),
    }
}

/// Matches the state by full name or by its `SP` abbreviation, ignoring case and surrounding whitespace.
pub fn is_sao_paulo(state: &str) -> bool {
    let state = state.trim().to_lowercase();
    state == "sp" || state == "são paulo" || state == "sao paulo"
}

/// Generates a tracking code of the form `BR#########BR`, using the last nine digits of the timestamp in milliseconds.
pub fn generate_tracking_code(now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis().unsigned_abs();
    format!("BR{:09}BR", millis % 1_000_000_000)
}

const STATES: [(&str, &str); 27] = [
    ("AC", "Acre"),
    ("AL", "Alagoas"),
    ("AP", "Amapá"),
    ("AM", "Amazonas"),
    ("BA", "Bahia"),
    ("CE", "Ceará"),
    ("DF", "Distrito Federal"),
    ("ES", "Espírito Santo"),
    ("GO", "Goiás"),
    ("MA", "Maranhão"),
    ("MT", "Mato Grosso"),
    ("MS", "Mato Grosso do Sul"),
    ("MG", "Minas Gerais"),
    ("PA", "Pará"),
    ("PB", "Paraíba"),
    ("PR", "Paraná"),
    ("PE", "Pernambuco"),
    ("PI", "Piauí"),
    ("RJ", "Rio de Janeiro"),
    ("RN", "Rio Grande do Norte"),
    ("RS", "Rio Grande do Sul"),
    ("RO", "Rondônia"),
    ("RR", "Roraima"),
    ("SC", "Santa Catarina"),
    ("SP", "São Paulo"),
    ("SE", "Sergipe"),
    ("TO", "Tocantins"),
];

/// The full state name for a two-letter UF code, e.g. `"MG"` is `"Minas Gerais"`.
pub fn state_name_for_uf(uf: &str) -> Option<&'static str> {
    let uf = uf.trim().to_ascii_uppercase();
    STATES.iter().find(|(code, _)| *code == uf).map(|(_, name)| *name)
}
