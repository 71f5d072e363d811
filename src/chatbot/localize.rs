//! Thai date/time formatting and city-name helpers.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use regex::Regex;

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Bangkok;

const THAI_MONTHS: [&str; 12] = [
    "มกราคม",
    "กุมภาพันธ์",
    "มีนาคม",
    "เมษายน",
    "พฤษภาคม",
    "มิถุนายน",
    "กรกฎาคม",
    "สิงหาคม",
    "กันยายน",
    "ตุลาคม",
    "พฤศจิกายน",
    "ธันวาคม",
];

/// Buddhist era offset.
const BE_OFFSET: i32 = 543;

const THAI_CITIES: &[(&str, &str)] = &[
    ("กรุงเทพ", "Bangkok"),
    ("กรุงเทพฯ", "Bangkok"),
    ("กรุงเทพมหานคร", "Bangkok"),
    ("เชียงใหม่", "Chiang Mai"),
    ("ขอนแก่น", "Khon Kaen"),
    ("ชลบุรี", "Chonburi"),
    ("นครราชสีมา", "Nakhon Ratchasima"),
    ("โคราช", "Nakhon Ratchasima"),
    ("พิษณุโลก", "Phitsanulok"),
    ("เชียงราย", "Chiang Rai"),
    ("อุดรธานี", "Udon Thani"),
    ("อุบลราชธานี", "Ubon Ratchathani"),
    ("นครศรีธรรมราช", "Nakhon Si Thammarat"),
    ("สุราษฎร์ธานี", "Surat Thani"),
    ("ภูเก็ต", "Phuket"),
    ("หาดใหญ่", "Hat Yai"),
    ("พัทยา", "Pattaya"),
];

static CITY_AFTER_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:ที่|จังหวัด|เมือง)\s*(\S.*)$").unwrap());

fn thai_weekday(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "วันจันทร์",
        Weekday::Tue => "วันอังคาร",
        Weekday::Wed => "วันพุธ",
        Weekday::Thu => "วันพฤหัสบดี",
        Weekday::Fri => "วันศุกร์",
        Weekday::Sat => "วันเสาร์",
        Weekday::Sun => "วันอาทิตย์",
    }
}

/// "วันจันทร์ที่ 1 มกราคม 2567"
pub fn thai_date<T: TimeZone>(dt: &DateTime<T>) -> String {
    format!(
        "{}ที่ {} {} {}",
        thai_weekday(dt.weekday()),
        dt.day(),
        THAI_MONTHS[dt.month0() as usize],
        dt.year() + BE_OFFSET
    )
}

/// "วันจันทร์ที่ 1 มกราคม 2567 เวลา 09:05 น."
pub fn thai_datetime<T: TimeZone>(dt: &DateTime<T>) -> String {
    format!("{} เวลา {:02}:{:02} น.", thai_date(dt), dt.hour(), dt.minute())
}

pub fn parse_timezone(name: &str) -> Option<Tz> {
    name.trim().parse::<Tz>().ok()
}

/// Current time in the named zone, falling back to Bangkok.
pub fn now_in(zone: Option<&str>) -> DateTime<Tz> {
    let tz = zone.and_then(parse_timezone).unwrap_or(DEFAULT_TIMEZONE);
    Utc::now().with_timezone(&tz)
}

/// Thai city name to its English spelling; unknown names pass through.
pub fn city_to_english(city: &str) -> String {
    let city = city.trim();
    THAI_CITIES
        .iter()
        .find(|(thai, _)| *thai == city)
        .map(|(_, english)| english.to_string())
        .unwrap_or_else(|| city.to_string())
}

/// City named after ที่/จังหวัด/เมือง in a weather question.
pub fn extract_city(text: &str) -> Option<String> {
    let caps = CITY_AFTER_MARKER.captures(text.trim())?;
    let city = caps[1].trim();
    (!city.is_empty()).then(|| city_to_english(city))
}
