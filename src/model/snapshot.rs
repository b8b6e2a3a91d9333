use crate::model::Symbol;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    captured_at: DateTime<Utc>,
    values: Vec<(Symbol, Option<f64>)>,
}

impl Snapshot {
    // Keeps the first value for a repeated symbol, column order is insertion order.
    pub fn new(captured_at: DateTime<Utc>, values: Vec<(Symbol, Option<f64>)>) -> Snapshot {
        let mut deduped: Vec<(Symbol, Option<f64>)> = Vec::with_capacity(values.len());

        for (symbol, rate) in values {
            if deduped.iter().any(|(it, _)| *it == symbol) {
                continue;
            }
            deduped.push((symbol, rate));
        }

        Snapshot {
            captured_at,
            values: deduped,
        }
    }

    pub fn from_rates(
        captured_at: DateTime<Utc>,
        symbols: &[Symbol],
        rates: &HashMap<String, f64>,
    ) -> Snapshot {
        let values = symbols
            .iter()
            .map(|it| (it.clone(), rates.get(it.as_str()).copied()))
            .collect();
        Snapshot::new(captured_at, values)
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn values(&self) -> &[(Symbol, Option<f64>)] {
        &self.values
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        self.values.iter().map(|(it, _)| it.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
