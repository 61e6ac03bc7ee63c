// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 5D bill of quantities.

use axum::{extract::Query, response::Response, Json};
use bim45d_processing::cost::{self, PriceList, BOQ_FILE};
use bim45d_processing::objects;
use serde::Deserialize;

use crate::error::ApiError;
use crate::extract::CurrentSession;
use crate::routes::tables::{TableFormat, TableQuery};
use crate::routes::{attachment, content, CSV, JSON, XLSX};

#[derive(Debug, Default, Deserialize)]
pub struct BoqRequest {
    #[serde(default)]
    pub prices: PriceList,
    /// `Key,UnitPrice` CSV merged over `prices`
    pub price_csv: Option<String>,
    #[serde(default)]
    pub quantity_names: Vec<String>,
}

/// POST /api/v1/cost/boq?level=&class=&type=&format=json|csv|xlsx
pub async fn boq(
    current: CurrentSession,
    Query(query): Query<TableQuery>,
    Json(request): Json<BoqRequest>,
) -> Result<Response, ApiError> {
    let mut prices = request.prices;
    if let Some(csv) = request.price_csv.as_deref() {
        prices.extend(cost::parse_price_list(csv)?);
    }

    let model = current.model().await?;
    let quantities = tokio::task::spawn_blocking(move || objects::quantities_table(&model)).await?;
    let boq = cost::boq_from_table(&query.apply(&quantities), &prices, &request.quantity_names)?;
    tracing::info!(
        session = %current.id,
        lines = boq.lines.len(),
        grand_total = boq.grand_total,
        "Priced bill of quantities"
    );

    match query.format {
        TableFormat::Csv => attachment(CSV, BOQ_FILE, boq.to_csv()?),
        TableFormat::Xlsx => attachment(XLSX, "boq.xlsx", boq.to_table().to_xlsx("BOQ")?),
        _ => content(JSON, serde_json::to_vec(&boq)?),
    }
}
