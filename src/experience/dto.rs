use time::Date;

use crate::body::Payload;
use crate::dates::parse_date;
use crate::error::AppError;

pub const TIPO_LAVORO: &str = "lavoro";
pub const TIPO_FORMAZIONE: &str = "formazione";

#[derive(Debug)]
pub struct ExperienceForm {
    pub tipo: String,
    pub titolo: String,
    pub azienda_istituto: String,
    pub data_inizio: Date,
    pub data_fine: Option<Date>,
    pub is_current: bool,
    pub descrizione: Option<String>,
}

impl ExperienceForm {
    /// New-entry submission: leaving the end date empty marks the
    /// experience as ongoing.
    pub fn parse_new(payload: &Payload) -> Result<Self, AppError> {
        let data_fine = payload.trimmed("data_fine");
        let is_current = data_fine.is_empty();
        Self::build(payload, is_current)
    }

    /// Edit submission: the ongoing flag is explicit, and an end date is
    /// required whenever it is off.
    pub fn parse_update(payload: &Payload) -> Result<Self, AppError> {
        let is_current = matches!(
            payload.trimmed("is_current").as_str(),
            "1" | "true" | "on"
        );
        Self::build(payload, is_current)
    }

    fn build(payload: &Payload, is_current: bool) -> Result<Self, AppError> {
        let tipo = payload.trimmed("tipo");
        let titolo = payload.trimmed("titolo");
        // Older frontend revisions posted the company field as "azienda".
        let azienda_istituto = {
            let v = payload.trimmed("azienda_istituto");
            if v.is_empty() {
                payload.trimmed("azienda")
            } else {
                v
            }
        };
        let data_inizio = payload.trimmed("data_inizio");
        let data_fine = payload.trimmed("data_fine");
        let descrizione = payload.trimmed("descrizione");

        if tipo != TIPO_LAVORO && tipo != TIPO_FORMAZIONE {
            return Err(AppError::Validation("Tipo di esperienza non valido".into()));
        }
        if titolo.is_empty() || azienda_istituto.is_empty() || data_inizio.is_empty() {
            return Err(AppError::Validation(
                "Tutti i campi obbligatori devono essere compilati".into(),
            ));
        }
        if !is_current && data_fine.is_empty() {
            return Err(AppError::Validation(
                "Data di fine obbligatoria se non in corso".into(),
            ));
        }

        let data_inizio = parse_date(&data_inizio)?;
        let data_fine = if is_current {
            None
        } else {
            Some(parse_date(&data_fine)?)
        };

        Ok(Self {
            tipo,
            titolo,
            azienda_istituto,
            data_inizio,
            data_fine,
            is_current,
            descrizione: if descrizione.is_empty() {
                None
            } else {
                Some(descrizione)
            },
        })
    }
}
