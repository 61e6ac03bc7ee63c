// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 5D cost estimation
//!
//! Bill of quantities from the long quantities table, priced with a unit
//! price list keyed by `Class` or `Class.QuantityName`.

use std::collections::BTreeMap;

use bim45d_core::{IfcModel, PropertyValue};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::objects::quantities_table;
use crate::table::Table;

pub const BOQ_COLUMNS: [&str; 8] = [
    "Class",
    "Type",
    "QuantitySet",
    "QuantityName",
    "Count",
    "TotalQuantity",
    "UnitPrice",
    "Cost",
];
pub const BOQ_FILE: &str = "boq.csv";

const GROUP_COLUMNS: [&str; 4] = ["Class", "Type", "QuantitySet", "QuantityName"];

/// Unit prices by `Class` or `Class.QuantityName`
pub type PriceList = BTreeMap<String, f64>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoqLine {
    pub class: String,
    pub type_name: Option<String>,
    pub quantity_set: String,
    pub quantity_name: String,
    pub count: usize,
    pub total_quantity: f64,
    pub unit_price: Option<f64>,
    pub cost: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Boq {
    pub lines: Vec<BoqLine>,
    pub grand_total: f64,
}

/// Price for one line; `Class.QuantityName` beats `Class`
pub fn unit_price(prices: &PriceList, class: &str, quantity_name: &str) -> Option<f64> {
    prices
        .get(&format!("{}.{}", class, quantity_name))
        .or_else(|| prices.get(class))
        .copied()
}

/// Price list from CSV with `Key,UnitPrice` columns
pub fn parse_price_list(content: &str) -> Result<PriceList> {
    #[derive(Deserialize)]
    struct Row {
        #[serde(rename = "Key")]
        key: String,
        #[serde(rename = "UnitPrice")]
        unit_price: f64,
    }

    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(content.as_bytes());
    let mut prices = PriceList::new();
    for row in reader.deserialize::<Row>() {
        let row = row?;
        if row.key.is_empty() {
            return Err(Error::invalid("price list row without a key"));
        }
        prices.insert(row.key, row.unit_price);
    }
    check_prices(&prices)?;
    Ok(prices)
}

/// Every unit price must be finite and not negative
pub fn check_prices(prices: &PriceList) -> Result<()> {
    match prices.iter().find(|(_, price)| !price.is_finite() || **price < 0.0) {
        Some((key, _)) => Err(Error::invalid(format!("invalid unit price for '{}'", key))),
        None => Ok(()),
    }
}

fn text(value: &PropertyValue) -> Option<String> {
    (!value.is_null()).then(|| value.to_string())
}

/// Group a quantities table by class, type and quantity
///
/// `quantity_names` restricts the lines when not empty.
pub fn boq_from_table(quantities: &Table, prices: &PriceList, quantity_names: &[String]) -> Result<Boq> {
    check_prices(prices)?;
    let selected = if quantity_names.is_empty() {
        quantities.clone()
    } else {
        let name_idx = quantities
            .column_index("QuantityName")
            .ok_or_else(|| Error::invalid("quantities table has no QuantityName column"))?;
        quantities.filter(|row| quantity_names.iter().any(|n| row[name_idx].to_string() == *n))
    };

    let mut lines = Vec::new();
    for (keys, count, total) in selected.group_sum(&GROUP_COLUMNS, "QuantityValue")? {
        let class = keys[0].to_string();
        let quantity_name = keys[3].to_string();
        let price = unit_price(prices, &class, &quantity_name);
        lines.push(BoqLine {
            type_name: text(&keys[1]),
            quantity_set: keys[2].to_string(),
            count,
            total_quantity: total,
            unit_price: price,
            cost: price.map(|p| p * total),
            class,
            quantity_name,
        });
    }
    let grand_total = lines.iter().filter_map(|l| l.cost).sum();
    tracing::debug!(lines = lines.len(), grand_total, "Built bill of quantities");
    Ok(Boq { lines, grand_total })
}

pub fn build_boq(model: &IfcModel, prices: &PriceList, quantity_names: &[String]) -> Result<Boq> {
    boq_from_table(&quantities_table(model), prices, quantity_names)
}

impl Boq {
    pub fn to_table(&self) -> Table {
        let mut table = Table::new(BOQ_COLUMNS);
        for line in &self.lines {
            table.push_row(vec![
                line.class.as_str().into(),
                line.type_name.as_deref().into(),
                line.quantity_set.as_str().into(),
                line.quantity_name.as_str().into(),
                PropertyValue::from(line.count as i64),
                line.total_quantity.into(),
                line.unit_price.map_or(PropertyValue::Null, PropertyValue::Real),
                line.cost.map_or(PropertyValue::Null, PropertyValue::Real),
            ]);
        }
        table
    }

    /// BOQ lines followed by a TOTAL row
    pub fn to_csv(&self) -> Result<String> {
        let mut table = self.to_table();
        let mut total = vec![PropertyValue::Null; BOQ_COLUMNS.len()];
        total[0] = "TOTAL".into();
        total[BOQ_COLUMNS.len() - 1] = PropertyValue::Real(self.grand_total);
        table.push_row(total);
        table.to_csv()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture;

    fn prices() -> PriceList {
        PriceList::from([
            ("IfcWall".to_string(), 100.0),
            ("IfcWall.NetVolume".to_string(), 250.0),
            ("IfcSlab.NetVolume".to_string(), 180.0),
        ])
    }

    #[test]
    fn test_unit_price_precedence() {
        let prices = prices();
        assert_eq!(unit_price(&prices, "IfcWall", "NetVolume"), Some(250.0));
        assert_eq!(unit_price(&prices, "IfcWall", "Length"), Some(100.0));
        assert_eq!(unit_price(&prices, "IfcBeam", "Length"), None);
    }

    #[test]
    fn test_boq_grouping() {
        let model = fixture::model();
        let boq = build_boq(&model, &prices(), &[]).unwrap();

        let wall_length = boq
            .lines
            .iter()
            .find(|l| l.class == "IfcWall" && l.quantity_name == "Length")
            .unwrap();
        assert_eq!(wall_length.count, 2);
        assert_eq!(wall_length.type_name.as_deref(), Some("RC Wall 300"));
        assert!((wall_length.total_quantity - 10.0).abs() < 1e-9);
        assert_eq!(wall_length.cost, Some(1000.0));

        let beam = boq.lines.iter().find(|l| l.class == "IfcBeam").unwrap();
        assert!(beam.type_name.is_none());
        assert!(beam.cost.is_none());

        // wall length 1000 + wall volume 2250 + slab volume 2160
        assert!((boq.grand_total - 5410.0).abs() < 1e-9);
    }

    #[test]
    fn test_boq_quantity_filter_and_csv() {
        let model = fixture::model();
        let boq = build_boq(&model, &prices(), &["NetVolume".to_string()]).unwrap();
        assert_eq!(boq.lines.len(), 3);
        assert!(boq.lines.iter().all(|l| l.quantity_name == "NetVolume"));
        assert!((boq.grand_total - 4410.0).abs() < 1e-9);

        let csv = boq.to_csv().unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("Class,Type,QuantitySet,QuantityName,Count,TotalQuantity,UnitPrice,Cost")
        );
        assert!(csv.trim_end().ends_with(",4410"));
        assert!(csv.contains("TOTAL,"));
    }

    #[test]
    fn test_parse_price_list() {
        let prices = parse_price_list("Key,UnitPrice\nIfcWall, 100\nIfcSlab.NetVolume,180.5\n").unwrap();
        assert_eq!(prices.get("IfcSlab.NetVolume"), Some(&180.5));
        assert!(parse_price_list("Key,UnitPrice\nIfcWall,-1\n").is_err());
        assert!(parse_price_list("Key,UnitPrice\nIfcWall,cheap\n").is_err());
    }

    #[test]
    fn test_negative_json_price_rejected() {
        let model = fixture::model();
        let prices = PriceList::from([("IfcWall".to_string(), -100.0)]);
        let err = build_boq(&model, &prices, &[]).unwrap_err();
        assert!(err.to_string().contains("IfcWall"));

        let nan = PriceList::from([("IfcSlab.NetVolume".to_string(), f64::NAN)]);
        assert!(check_prices(&nan).is_err());
        assert!(check_prices(&self::prices()).is_ok());
    }
}
