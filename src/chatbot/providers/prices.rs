//! Oil, gold and currency prices.

use chrono::DateTime;
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::Value;

use crate::chatbot::localize::thai_date;
use crate::chatbot::lookup::LookupError;

pub const OIL_URL: &str = "https://oil-price.bangchak.co.th/ApiOilPrice2/th";
pub const GOLD_URL: &str = "https://api.chnwt.dev/thai-gold-api/latest";
pub const EXCHANGE_URL: &str = "https://open.er-api.com/v6/latest/THB";

/// Provider fuel names and how we display them.
const OIL_GRADES: &[(&str, &str)] = &[
    ("แก๊สโซฮอล์ 95 S EVO", "แก๊สโซฮอล์ 95"),
    ("แก๊สโซฮอล์ 91 S EVO", "แก๊สโซฮอล์ 91"),
    ("ไฮดีเซล S", "ดีเซล"),
];

const CURRENCIES: &[&str] = &["USD", "EUR", "JPY", "CNY"];

#[derive(Deserialize)]
struct OilDay {
    /// JSON-encoded list inside a string.
    #[serde(rename = "OilList")]
    oil_list: Option<String>,
}

#[derive(Deserialize)]
struct OilItem {
    #[serde(rename = "OilName", default)]
    name: String,
    #[serde(rename = "PriceToday")]
    price: Option<Value>,
}

fn display_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "-".to_string(),
    }
}

pub fn format_oil(body: &str, today: &DateTime<Tz>) -> Result<String, LookupError> {
    let days: Vec<OilDay> = serde_json::from_str(body).map_err(|e| LookupError::Parse(e.to_string()))?;
    let raw_list = days
        .into_iter()
        .next()
        .and_then(|d| d.oil_list)
        .ok_or(LookupError::NotFound)?;
    let items: Vec<OilItem> = serde_json::from_str(&raw_list).map_err(|e| LookupError::Parse(e.to_string()))?;

    let lines: Vec<String> = OIL_GRADES
        .iter()
        .filter_map(|(source, shown)| {
            items
                .iter()
                .find(|item| item.name == *source)
                .map(|item| format!("⛽ {}: {} บาท/ลิตร", shown, display_value(item.price.as_ref())))
        })
        .collect();

    if lines.is_empty() {
        return Err(LookupError::NotFound);
    }
    Ok(format!("📅 ราคาน้ำมันประจำ{}\n{}", thai_date(today), lines.join("\n")))
}

pub fn format_gold(body: &str, today: &DateTime<Tz>) -> Result<String, LookupError> {
    let data: Value = serde_json::from_str(body).map_err(|e| LookupError::Parse(e.to_string()))?;
    let response = data.get("response").ok_or(LookupError::NotFound)?;
    let gold_bar = response.pointer("/price/gold_bar").ok_or(LookupError::NotFound)?;

    let text = |v: Option<&Value>, missing: &str| match v {
        Some(Value::Null) | None => missing.to_string(),
        other => display_value(other),
    };

    Ok(format!(
        "📅 {}\n🕒 อัปเดตเมื่อ: {} ({})\n🏷️ ราคาทองคำแท่ง 96.5%\n💰 รับซื้อ: {} บาท\n💸 ขายออก: {} บาท",
        thai_date(today),
        text(response.get("update_time"), "ไม่ทราบเวลา"),
        text(response.get("date"), "ไม่ทราบวันที่"),
        text(gold_bar.get("buy"), "ไม่ทราบ"),
        text(gold_bar.get("sell"), "ไม่ทราบ"),
    ))
}

#[derive(Deserialize)]
struct ExchangeResponse {
    #[serde(default)]
    result: String,
    #[serde(default)]
    rates: std::collections::HashMap<String, f64>,
}

pub fn format_exchange(body: &str) -> Result<String, LookupError> {
    let data: ExchangeResponse = serde_json::from_str(body).map_err(|e| LookupError::Parse(e.to_string()))?;
    if data.result != "success" {
        return Err(LookupError::NotFound);
    }
    let lines: Vec<String> = CURRENCIES
        .iter()
        .filter_map(|cur| data.rates.get(*cur).map(|rate| format!("💱 1 THB ≈ {rate:.2} {cur}")))
        .collect();
    if lines.is_empty() {
        return Err(LookupError::NotFound);
    }
    Ok(format!("📊 อัตราแลกเปลี่ยนวันนี้ (THB):\n{}", lines.join("\n")))
}
