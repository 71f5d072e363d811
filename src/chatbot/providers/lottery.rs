//! Latest government lottery draw.

use serde::Deserialize;

use crate::chatbot::lookup::LookupError;

pub const LOTTERY_URL: &str = "https://lotto.api.rayriffy.com/latest";

#[derive(Deserialize)]
struct Envelope {
    response: Draw,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Draw {
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    prizes: Vec<NumberGroup>,
    #[serde(default)]
    running_numbers: Vec<NumberGroup>,
}

#[derive(Deserialize)]
struct NumberGroup {
    id: String,
    #[serde(default)]
    number: Vec<String>,
}

fn numbers<'a>(groups: &'a [NumberGroup], id: &str) -> &'a [String] {
    groups
        .iter()
        .find(|g| g.id == id)
        .map(|g| g.number.as_slice())
        .unwrap_or_default()
}

fn joined(values: &[String]) -> String {
    if values.is_empty() {
        "ไม่ทราบ".to_string()
    } else {
        values.join(", ")
    }
}

pub fn format_lottery(body: &str) -> Result<String, LookupError> {
    let Envelope { response: draw } = serde_json::from_str(body).map_err(|e| LookupError::Parse(e.to_string()))?;

    let first = numbers(&draw.prizes, "prizeFirst");
    if first.is_empty() {
        return Err(LookupError::NotFound);
    }
    let last_two = numbers(&draw.running_numbers, "runningNumberBackTwo");

    Ok(format!(
        "📅 งวดวันที่: {}\n🏆 รางวัลที่ 1: {}\n🔢 เลขท้าย 2 ตัว: {}\n🔹 เลขหน้า 3 ตัว: {}\n🔸 เลขท้าย 3 ตัว: {}",
        draw.date.as_deref().unwrap_or("ไม่ทราบวันที่"),
        first[0],
        last_two.first().map(String::as_str).unwrap_or("ไม่ทราบ"),
        joined(numbers(&draw.running_numbers, "runningNumberFrontThree")),
        joined(numbers(&draw.running_numbers, "runningNumberBackThree")),
    ))
}
