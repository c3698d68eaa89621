use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use time::macros::format_description;
use time::OffsetDateTime;

use crate::auth::repo::User;
use crate::dates::format_date;
use crate::experience::dto::{TIPO_FORMAZIONE, TIPO_LAVORO};
use crate::experience::repo::Experience;
use crate::profile::repo::CvData;

const PAGE_W: Mm = Mm(210.0);
const PAGE_H: Mm = Mm(297.0);
const TOP: Mm = Mm(272.0);
const BOTTOM: Mm = Mm(18.0);
const LEFT_X: Mm = Mm(16.0);
const RIGHT_X: Mm = Mm(82.0);

/// Render a two-column résumé: contacts, skills and languages on the left,
/// work and education history on the right, a generation footer at the
/// bottom. Returns the finished PDF bytes.
pub fn build_cv_pdf(
    user: &User,
    cv: &CvData,
    experiences: &[Experience],
) -> anyhow::Result<Vec<u8>> {
    let (doc, page, layer) = PdfDocument::new("Curriculum Vitae", PAGE_W, PAGE_H, "Layer 1");
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
    let layer = doc.get_page(page).get_layer(layer);

    let full_name = clean(&format!("{} {}", user.nome, user.cognome));
    let title = if full_name.trim().is_empty() {
        "Curriculum Vitae".to_string()
    } else {
        full_name
    };
    layer.use_text(title, 24.0, LEFT_X, Mm(282.0), &bold);

    // Left column: contacts, skills, languages.
    let mut left = Cursor { y: TOP };
    section(&layer, &bold, &mut left, LEFT_X, "Contatti");
    for line in contact_lines(user, cv) {
        body_line(&layer, &regular, &mut left, LEFT_X, &line);
    }
    left.space();

    section(&layer, &bold, &mut left, LEFT_X, "Competenze");
    for line in bullet_lines(cv.skills.as_deref()) {
        body_line(&layer, &regular, &mut left, LEFT_X, &line);
    }
    left.space();

    section(&layer, &bold, &mut left, LEFT_X, "Lingue");
    for line in bullet_lines(cv.languages.as_deref()) {
        body_line(&layer, &regular, &mut left, LEFT_X, &line);
    }

    // Right column: experience history.
    let mut right = Cursor { y: TOP };
    let work: Vec<&Experience> = experiences.iter().filter(|e| e.tipo == TIPO_LAVORO).collect();
    if !work.is_empty() {
        section(&layer, &bold, &mut right, RIGHT_X, "Esperienze Lavorative");
        for exp in work {
            experience_block(&layer, &regular, &bold, &mut right, exp);
        }
    }
    let education: Vec<&Experience> = experiences
        .iter()
        .filter(|e| e.tipo == TIPO_FORMAZIONE)
        .collect();
    if !education.is_empty() {
        right.space();
        section(&layer, &bold, &mut right, RIGHT_X, "Formazione");
        for exp in education {
            experience_block(&layer, &regular, &bold, &mut right, exp);
        }
    }

    let stamp_fmt = format_description!("[day]/[month]/[year] [hour]:[minute]");
    let stamp = OffsetDateTime::now_utc()
        .format(stamp_fmt)
        .unwrap_or_default();
    layer.use_text(
        format!("Generato il {stamp}"),
        8.0,
        RIGHT_X,
        Mm(12.0),
        &regular,
    );

    let bytes = doc.save_to_bytes()?;
    Ok(bytes)
}

struct Cursor {
    y: Mm,
}

impl Cursor {
    fn advance(&mut self, amount: Mm) -> bool {
        if self.y < BOTTOM {
            return false;
        }
        self.y = self.y - amount;
        true
    }

    fn space(&mut self) {
        self.y = self.y - Mm(4.0);
    }
}

fn section(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    cursor: &mut Cursor,
    x: Mm,
    title: &str,
) {
    if !cursor.advance(Mm(8.0)) {
        return;
    }
    layer.use_text(title, 13.0, x, cursor.y, font);
    cursor.y = cursor.y - Mm(6.0);
}

fn body_line(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    cursor: &mut Cursor,
    x: Mm,
    text: &str,
) {
    for line in wrap_text(text, 52) {
        if cursor.y < BOTTOM {
            return; // column full, remaining lines are dropped
        }
        layer.use_text(line, 10.0, x, cursor.y, font);
        cursor.y = cursor.y - Mm(5.0);
    }
}

fn experience_block(
    layer: &PdfLayerReference,
    regular: &IndirectFontRef,
    bold: &IndirectFontRef,
    cursor: &mut Cursor,
    exp: &Experience,
) {
    if cursor.y < BOTTOM {
        return;
    }
    let heading = clean(&format!("{} - {}", exp.titolo, exp.azienda_istituto));
    layer.use_text(heading, 11.0, RIGHT_X, cursor.y, bold);
    cursor.y = cursor.y - Mm(5.0);

    let fine = match (exp.is_current, exp.data_fine) {
        (true, _) => "In corso".to_string(),
        (false, Some(d)) => format_date(d),
        (false, None) => String::new(),
    };
    body_line(
        layer,
        regular,
        cursor,
        RIGHT_X,
        &format!("{} - {}", format_date(exp.data_inizio), fine),
    );
    if let Some(descrizione) = &exp.descrizione {
        body_line(layer, regular, cursor, RIGHT_X, descrizione);
    }
    cursor.space();
}

fn contact_lines(user: &User, cv: &CvData) -> Vec<String> {
    [
        cv.telefono.as_deref(),
        Some(user.email.as_str()),
        cv.linkedin_url.as_deref(),
        cv.citta.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(|s| clean(s))
    .filter(|s| !s.is_empty())
    .collect()
}

/// Comma-separated free text becomes a bullet list, anything else a single
/// paragraph; no data at all renders a placeholder line.
fn bullet_lines(text: Option<&str>) -> Vec<String> {
    let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
        return vec!["Nessun dato inserito".to_string()];
    };
    if text.contains(',') {
        text.split(',')
            .map(|item| item.trim())
            .filter(|item| !item.is_empty())
            .map(|item| format!("- {}", clean(item)))
            .collect()
    } else {
        vec![clean(text.trim())]
    }
}

/// Strip control characters; the layout library has no use for them and
/// they corrupt the text stream.
fn clean(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Greedy word wrap by character count; long unbreakable words get their
/// own line.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current = word.to_string();
        } else if current.chars().count() + 1 + word.chars().count() <= width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(current);
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn sample_user() -> User {
        User {
            id: 1,
            email: "mario@test.it".into(),
            password_hash: "x".into(),
            nome: "Mario".into(),
            cognome: "Rossi".into(),
            role: "student".into(),
            created_at: datetime!(2024-01-01 00:00:00 UTC),
        }
    }

    fn sample_cv() -> CvData {
        CvData {
            user_id: 1,
            telefono: Some("+39 333 1234567".into()),
            citta: Some("Milano".into()),
            skills: Some("Rust, SQL, Docker".into()),
            languages: Some("Italiano, Inglese".into()),
            ..Default::default()
        }
    }

    fn sample_experience() -> Experience {
        Experience {
            id: 1,
            user_id: 1,
            tipo: "lavoro".into(),
            titolo: "Backend Engineer".into(),
            azienda_istituto: "Acme".into(),
            data_inizio: date!(2020 - 01 - 01),
            data_fine: None,
            is_current: true,
            descrizione: Some("Servizi HTTP in produzione".into()),
        }
    }

    #[test]
    fn generated_bytes_are_a_pdf() {
        let bytes = build_cv_pdf(&sample_user(), &sample_cv(), &[sample_experience()]).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500);
    }

    #[test]
    fn empty_profile_still_produces_a_document() {
        let bytes = build_cv_pdf(&sample_user(), &CvData::default(), &[]).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn bullets_split_on_commas() {
        let lines = bullet_lines(Some("Rust, SQL , Docker"));
        assert_eq!(lines, vec!["- Rust", "- SQL", "- Docker"]);
        assert_eq!(bullet_lines(Some("solo testo")), vec!["solo testo"]);
        assert_eq!(bullet_lines(None), vec!["Nessun dato inserito"]);
    }

    #[test]
    fn wrap_respects_width() {
        let lines = wrap_text("uno due tre quattro cinque", 10);
        assert!(lines.iter().all(|l| l.chars().count() <= 10));
        assert_eq!(lines.concat().replace(' ', ""), "unoduetrequattrocinque");
    }
}
