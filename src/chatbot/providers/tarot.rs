//! Three-card Major Arcana readings with a model-written summary.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::chatbot::message::Message;

pub const SUBJECTS: &[&str] = &["ความรัก", "การงาน", "การเงิน", "สุขภาพ"];

/// Asked when someone wants a reading but has not picked a subject.
pub const SUBJECT_PROMPT: &str = "🔮 อยากดูดวงเรื่องอะไรดี? พิมพ์: ความรัก, การงาน, การเงิน, สุขภาพ";

pub const CARDS_PER_READING: usize = 3;

pub struct Card {
    pub name: &'static str,
    pub upright: &'static str,
    pub reversed: &'static str,
}

const fn card(name: &'static str, upright: &'static str, reversed: &'static str) -> Card {
    Card { name, upright, reversed }
}

pub const MAJOR_ARCANA: &[Card] = &[
    card("The Fool", "การเริ่มต้นใหม่ ความกล้า อิสระ", "ความประมาท ตัดสินใจเร็วเกินไป"),
    card("The Magician", "ความสามารถ ลงมือทำแล้วสำเร็จ", "ใช้ความสามารถผิดทาง ขาดความมั่นใจ"),
    card("The High Priestess", "สัญชาตญาณ ความลับ ความรู้ภายใน", "มองข้ามเสียงภายใน ความสับสน"),
    card("The Empress", "ความอุดมสมบูรณ์ ความรัก การดูแล", "พึ่งพาคนอื่นมากไป ขาดความสมดุล"),
    card("The Emperor", "ความมั่นคง ระเบียบ ภาวะผู้นำ", "ควบคุมมากเกินไป ดื้อรั้น"),
    card("The Hierophant", "ประเพณี คำแนะนำจากผู้ใหญ่", "แหกกฎ อยากลองทางใหม่"),
    card("The Lovers", "ความรัก การเลือก ความสัมพันธ์ที่ลงตัว", "ความไม่ลงรอย การเลือกที่ผิด"),
    card("The Chariot", "ชัยชนะ ความมุ่งมั่น", "ขาดทิศทาง ควบคุมสถานการณ์ไม่ได้"),
    card("Strength", "ความอดทน ความเข้มแข็งภายใน", "ความไม่มั่นใจ อารมณ์แปรปรวน"),
    card("The Hermit", "การทบทวนตัวเอง ความสงบ", "ตัดขาดตัวเองมากเกินไป เหงา"),
    card("Wheel of Fortune", "โชคชะตาเปลี่ยน จังหวะดีมาถึง", "โชคไม่เข้าข้าง รอบของปัญหา"),
    card("Justice", "ความยุติธรรม ความสมดุล ผลของการกระทำ", "ความไม่ยุติธรรม หลีกเลี่ยงความรับผิดชอบ"),
    card("The Hanged Man", "การรอคอย มองมุมใหม่", "ติดอยู่กับที่ เสียสละโดยเปล่าประโยชน์"),
    card("Death", "การสิ้นสุดเพื่อเริ่มใหม่ การเปลี่ยนแปลง", "ยึดติดของเก่า กลัวการเปลี่ยนแปลง"),
    card("Temperance", "ความพอดี ความอดทน การประสาน", "ความไม่สมดุล ทำอะไรเกินพอดี"),
    card("The Devil", "การยึดติด สิ่งล่อใจ", "หลุดพ้นจากพันธนาการ"),
    card("The Tower", "การเปลี่ยนแปลงฉับพลัน", "หลีกเลี่ยงหายนะได้ การเปลี่ยนแปลงที่ถูกเลื่อนออกไป"),
    card("The Star", "ความหวัง แรงบันดาลใจ การเยียวยา", "หมดหวัง ขาดแรงจูงใจ"),
    card("The Moon", "ความไม่ชัดเจน ความกังวล", "ความจริงเปิดเผย ความกลัวคลี่คลาย"),
    card("The Sun", "ความสุข ความสำเร็จ พลังบวก", "ความสุขที่ล่าช้า มองโลกในแง่ดีเกินไป"),
    card("Judgement", "การตื่นรู้ โอกาสครั้งใหม่", "ลังเล ตัดสินตัวเองรุนแรงเกินไป"),
    card("The World", "ความสำเร็จสมบูรณ์ การบรรลุเป้าหมาย", "งานยังไม่เสร็จ ขาดอีกนิดเดียว"),
];

pub struct Draw {
    pub card: &'static Card,
    pub reversed: bool,
}

impl Draw {
    pub fn orientation(&self) -> &'static str {
        if self.reversed { "กลับหัว" } else { "ปกติ" }
    }

    pub fn meaning(&self) -> &'static str {
        if self.reversed { self.card.reversed } else { self.card.upright }
    }
}

pub fn is_subject(text: &str) -> bool {
    SUBJECTS.contains(&text.trim())
}

/// `n` distinct cards, each independently upright or reversed.
pub fn draw_cards<R: Rng + ?Sized>(rng: &mut R, n: usize) -> Vec<Draw> {
    MAJOR_ARCANA
        .choose_multiple(rng, n)
        .map(|card| Draw { card, reversed: rng.gen_bool(0.5) })
        .collect()
}

/// Request asking the model to summarize a reading.
pub fn summary_messages(subject: &str, draws: &[Draw]) -> Vec<Message> {
    let cards = draws
        .iter()
        .map(|d| format!("{} ({}): {}", d.card.name, d.orientation(), d.meaning()))
        .collect::<Vec<_>>()
        .join("\n");
    vec![
        Message::system("คุณคือหมอดูไพ่ทาโรต์ที่พูดจาเป็นกันเอง สรุปคำทำนายสั้น ๆ 3-4 ประโยค เป็นภาษาไทย"),
        Message::user(format!("หัวข้อ: {subject}\nไพ่ที่เปิดได้:\n{cards}\n\nช่วยสรุปคำทำนายภาพรวมให้หน่อย")),
    ]
}

pub fn format_reading(subject: &str, draws: &[Draw], summary: Option<&str>) -> String {
    let blocks = draws
        .iter()
        .map(|d| format!("🔹 **{}** ({})\n💬 _{}_", d.card.name, d.orientation(), d.meaning()))
        .collect::<Vec<_>>()
        .join("\n\n");
    let mut text = format!("🔮 **คำทำนายเรื่อง {subject} ของคุณ:**\n\n🃏 ไพ่ที่คุณได้:\n\n{blocks}");
    if let Some(summary) = summary {
        text.push_str(&format!("\n\n📝 **สรุปคำทำนาย:**\n{summary}"));
    }
    text
}
