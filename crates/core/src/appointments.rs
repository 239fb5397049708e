//! Client-session appointment booking.
//!
//! An [`AppointmentBook`] belongs to one client session. It is not persisted and not shared,
//! so nothing here coordinates with other sessions: slot availability is drawn at random on
//! every query and booking never re-checks it. Two sessions can book the "same" slot.
//!
//! Appointment status and payment status are independent axes:
//!
//! ```text
//! status:   scheduled -> completed | cancelled
//! payment:  pending   -> completed            (only while scheduled)
//! ```

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// First slot starts at this hour; the last one ends at [`LAST_SLOT_END_HOUR`].
pub const FIRST_SLOT_HOUR: u32 = 9;
pub const LAST_SLOT_END_HOUR: u32 = 17;
/// Probability that a generated slot is reported as available.
pub const SLOT_AVAILABILITY: f64 = 0.7;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BookingError {
    #[error("doctor not found: {0}")]
    DoctorNotFound(String),
    #[error("invalid time slot id: {0}")]
    InvalidTimeSlot(String),
    #[error("time slot {slot} does not belong to doctor {doctor}")]
    SlotDoctorMismatch { slot: String, doctor: String },
    #[error("appointment not found: {0}")]
    AppointmentNotFound(String),
    #[error("cannot {action} appointment {id} in status {status}")]
    InvalidTransition {
        id: String,
        action: &'static str,
        status: AppointmentStatus,
    },
    #[error("payment for appointment {0} is already completed")]
    AlreadyPaid(String),
}

pub type BookingResult<T> = std::result::Result<T, BookingError>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub specialty: String,
    pub rating: f32,
    pub bio: String,
    pub available: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub doctor_name: String,
    pub specialty: String,
    pub date_time: NaiveDateTime,
    pub status: AppointmentStatus,
    pub payment_status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consultation_id: Option<String>,
}

/// One bookable hour, derived on demand and never stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    /// `<doctorId>-<YYYY-MM-DD>-<HH>`
    pub id: String,
    pub doctor_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub available: bool,
}

/// Builds the slot id for `doctor_id` on `date` starting at `hour`.
pub fn time_slot_id(doctor_id: &str, date: NaiveDate, hour: u32) -> String {
    format!("{doctor_id}-{}-{hour:02}", date.format("%Y-%m-%d"))
}

/// Splits a slot id into doctor id, date and start hour.
///
/// Parsed from the right, so doctor ids may themselves contain `-`.
pub fn parse_time_slot_id(slot_id: &str) -> BookingResult<(String, NaiveDate, u32)> {
    let invalid = || BookingError::InvalidTimeSlot(slot_id.to_string());

    let (rest, hour) = slot_id.rsplit_once('-').ok_or_else(invalid)?;
    let hour: u32 = hour.parse().map_err(|_| invalid())?;
    if !(FIRST_SLOT_HOUR..LAST_SLOT_END_HOUR).contains(&hour) {
        return Err(invalid());
    }

    // YYYY-MM-DD is the last ten characters, preceded by the separator.
    let split = rest.len().checked_sub(11).ok_or_else(invalid)?;
    if !rest.is_char_boundary(split) || rest.as_bytes()[split] != b'-' {
        return Err(invalid());
    }
    let (doctor_id, date) = (&rest[..split], &rest[split + 1..]);
    if doctor_id.is_empty() {
        return Err(invalid());
    }
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| invalid())?;

    Ok((doctor_id.to_string(), date, hour))
}

/// Eight hourly slots from 09:00 to 17:00, each available with probability 0.7.
///
/// Availability is redrawn on every call.
pub fn generate_time_slots<R: Rng + ?Sized>(
    doctor_id: &str,
    date: NaiveDate,
    rng: &mut R,
) -> Vec<TimeSlot> {
    (FIRST_SLOT_HOUR..LAST_SLOT_END_HOUR)
        .filter_map(|hour| {
            let start_time = NaiveTime::from_hms_opt(hour, 0, 0)?;
            let end_time = NaiveTime::from_hms_opt(hour + 1, 0, 0)?;
            Some(TimeSlot {
                id: time_slot_id(doctor_id, date, hour),
                doctor_id: doctor_id.to_string(),
                date,
                start_time,
                end_time,
                available: rng.gen_bool(SLOT_AVAILABILITY),
            })
        })
        .collect()
}

/// Appointment state held by one client session.
#[derive(Debug)]
pub struct AppointmentBook<R: Rng = StdRng> {
    patient_id: String,
    doctors: Vec<Doctor>,
    appointments: Vec<Appointment>,
    rng: R,
}

impl AppointmentBook<StdRng> {
    pub fn new(patient_id: impl Into<String>, doctors: Vec<Doctor>) -> Self {
        Self::with_rng(patient_id, doctors, StdRng::from_entropy())
    }
}

impl<R: Rng> AppointmentBook<R> {
    /// Creates a book drawing slot availability from `rng`.
    pub fn with_rng(patient_id: impl Into<String>, doctors: Vec<Doctor>, rng: R) -> Self {
        Self {
            patient_id: patient_id.into(),
            doctors,
            appointments: Vec::new(),
            rng,
        }
    }

    pub fn doctors(&self) -> &[Doctor] {
        &self.doctors
    }

    pub fn appointments(&self) -> &[Appointment] {
        &self.appointments
    }

    pub fn get(&self, id: &str) -> Option<&Appointment> {
        self.appointments.iter().find(|a| a.id == id)
    }

    pub fn available_time_slots(&mut self, doctor_id: &str, date: NaiveDate) -> Vec<TimeSlot> {
        generate_time_slots(doctor_id, date, &mut self.rng)
    }

    /// Books `time_slot_id` with `doctor_id`.
    ///
    /// Slot availability is not re-checked.
    pub fn book(&mut self, doctor_id: &str, time_slot_id: &str) -> BookingResult<&Appointment> {
        let (slot_doctor, date, hour) = parse_time_slot_id(time_slot_id)?;
        if slot_doctor != doctor_id {
            return Err(BookingError::SlotDoctorMismatch {
                slot: time_slot_id.to_string(),
                doctor: doctor_id.to_string(),
            });
        }

        let doctor = self
            .doctors
            .iter()
            .find(|d| d.id == doctor_id)
            .ok_or_else(|| BookingError::DoctorNotFound(doctor_id.to_string()))?;

        let start = NaiveTime::from_hms_opt(hour, 0, 0)
            .ok_or_else(|| BookingError::InvalidTimeSlot(time_slot_id.to_string()))?;

        let appointment = Appointment {
            id: format!("appt-{}", Uuid::new_v4().simple()),
            patient_id: self.patient_id.clone(),
            doctor_id: doctor.id.clone(),
            doctor_name: doctor.name.clone(),
            specialty: doctor.specialty.clone(),
            date_time: date.and_time(start),
            status: AppointmentStatus::Scheduled,
            payment_status: PaymentStatus::Pending,
            consultation_id: None,
        };

        tracing::debug!(appointment_id = %appointment.id, doctor_id, "appointment booked");
        self.appointments.push(appointment);
        let last = self.appointments.len() - 1;
        Ok(&self.appointments[last])
    }

    pub fn cancel(&mut self, id: &str) -> BookingResult<&Appointment> {
        self.transition(id, "cancel", |appointment| {
            appointment.status = AppointmentStatus::Cancelled;
        })
    }

    pub fn complete(&mut self, id: &str) -> BookingResult<&Appointment> {
        self.transition(id, "complete", |appointment| {
            appointment.status = AppointmentStatus::Completed;
        })
    }

    /// Marks payment completed and assigns a consultation id.
    pub fn complete_payment(&mut self, id: &str) -> BookingResult<&Appointment> {
        let appointment = self.find_mut(id)?;
        if appointment.payment_status != PaymentStatus::Pending {
            return Err(BookingError::AlreadyPaid(id.to_string()));
        }
        Self::require_scheduled(appointment, "pay for")?;

        appointment.payment_status = PaymentStatus::Completed;
        appointment.consultation_id = Some(format!("cons-{}", Uuid::new_v4().simple()));
        Ok(appointment)
    }

    fn transition(
        &mut self,
        id: &str,
        action: &'static str,
        apply: impl FnOnce(&mut Appointment),
    ) -> BookingResult<&Appointment> {
        let appointment = self.find_mut(id)?;
        Self::require_scheduled(appointment, action)?;
        apply(appointment);
        Ok(appointment)
    }

    fn require_scheduled(appointment: &Appointment, action: &'static str) -> BookingResult<()> {
        if appointment.status == AppointmentStatus::Scheduled {
            Ok(())
        } else {
            Err(BookingError::InvalidTransition {
                id: appointment.id.clone(),
                action,
                status: appointment.status,
            })
        }
    }

    fn find_mut(&mut self, id: &str) -> BookingResult<&mut Appointment> {
        self.appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| BookingError::AppointmentNotFound(id.to_string()))
    }
}
