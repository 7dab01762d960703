//! Turns parsed fields into calibrated, smoothed records.

use std::collections::HashMap;

use chrono::{DateTime, Local};
use crane_traits::Record;

use crate::calibration::CalibrationModel;
use crate::error::LineError;
use crate::parser::ParsedFields;
use crate::smoothing::SmoothingBank;

#[derive(Debug)]
pub struct RecordAssembler {
    model: CalibrationModel,
    bank: SmoothingBank,
    /// Last ADC per crane, reused by heartbeats that carry none.
    last_adc: HashMap<u32, i64>,
}

impl RecordAssembler {
    pub fn new(model: CalibrationModel, window: usize) -> Self {
        Self {
            model,
            bank: SmoothingBank::new(window),
            last_adc: HashMap::new(),
        }
    }

    pub fn model(&self) -> &CalibrationModel {
        &self.model
    }

    pub fn smoothing(&self) -> &SmoothingBank {
        &self.bank
    }

    /// Build the record for `fields`, updating the crane's smoothing window.
    ///
    /// Fails without touching any state when the fields cannot produce a record.
    pub fn assemble(
        &mut self,
        fields: &ParsedFields,
        time: DateTime<Local>,
    ) -> Result<Record, LineError> {
        let crane_id = fields
            .crane_id
            .ok_or(LineError::IncompleteFrame("missing crane id"))?;
        let raw_adc = match fields.adc {
            Some(adc) => adc,
            None if fields.is_heartbeat() => *self
                .last_adc
                .get(&crane_id)
                .ok_or(LineError::IncompleteFrame("heartbeat before any ADC reading"))?,
            None => return Err(LineError::IncompleteFrame("missing ADC reading")),
        };
        let (x, y) = fields
            .position()
            .ok_or(LineError::IncompleteFrame("missing position"))?;

        let instant_mass = self.model.predict(raw_adc);
        let average_mass = self.bank.observe(crane_id, instant_mass);
        self.last_adc.insert(crane_id, raw_adc);

        Ok(Record {
            time,
            crane_id,
            raw_adc,
            average_mass,
            instant_mass,
            x,
            y,
        })
    }
}
