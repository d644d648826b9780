//! Registros de exemplo válidos para testes
//!
//! Disponível nos testes desta biblioteca e, com a feature `test-utils`,
//! para as aplicações que dependem dela.

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc, Weekday};

use crate::models::*;

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn doctor() -> Doctor {
    Doctor {
        id: DoctorId::new("doc-0001"),
        first_name: "Ana".to_string(),
        last_name: "Ribeiro".to_string(),
        specialty: "Cardiologia".to_string(),
        education: "FMUSP".to_string(),
        experience_years: 12,
        rating: 4.8,
        consultation_fee: 250.0,
        availability: vec![
            DayAvailability {
                day: Weekday::Mon,
                slots: vec!["09:00".to_string(), "10:00".to_string()],
            },
            DayAvailability {
                day: Weekday::Wed,
                slots: vec!["14:00".to_string()],
            },
        ],
        image: "https://cdn.clinica.med.br/doctors/doc-0001.jpg".to_string(),
        bio: "Atende adultos com foco em prevenção.".to_string(),
        location: "São Paulo, SP".to_string(),
    }
}

pub fn patient() -> Patient {
    Patient {
        id: PatientId::new("pat-0001"),
        first_name: "João".to_string(),
        last_name: "Souza".to_string(),
        email: "joao.souza@example.com".to_string(),
        phone: "+55 11 99999-0000".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1990, 7, 15).unwrap(),
        gender: "masculino".to_string(),
        insurance_provider: Some("Unimed".to_string()),
        insurance_number: Some("0042-7781".to_string()),
        medical_history: MedicalHistory {
            conditions: set(&["hipertensão"]),
            allergies: set(&["penicilina", "dipirona"]),
            medications: set(&["losartana 50mg"]),
            surgeries: BTreeSet::new(),
        },
        emergency_contact: Some(EmergencyContact {
            name: "Maria Souza".to_string(),
            relationship: "mãe".to_string(),
            phone: "+55 11 98888-1111".to_string(),
        }),
    }
}

pub fn appointment() -> Appointment {
    Appointment {
        id: AppointmentId::new("apt-0001"),
        patient_id: patient().id,
        doctor_id: doctor().id,
        date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
        start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
        modality: Modality::Video,
        status: AppointmentStatus::Scheduled,
        symptoms: Some("palpitações ao subir escadas".to_string()),
        notes: None,
        payment_status: PaymentStatus::Pending,
        payment_amount: 250.0,
    }
}

pub fn medication() -> MedicationEntry {
    MedicationEntry {
        name: "Atenolol".to_string(),
        dosage: "25mg".to_string(),
        frequency: "1x ao dia".to_string(),
        duration: "30 dias".to_string(),
        instructions: "Tomar pela manhã".to_string(),
    }
}

pub fn prescription() -> Prescription {
    let appointment = appointment();
    Prescription {
        id: PrescriptionId::new("rx-0001"),
        appointment_id: appointment.id,
        patient_id: appointment.patient_id,
        doctor_id: appointment.doctor_id,
        date: appointment.date,
        medications: vec![medication()],
        notes: Some("Retorno em 30 dias".to_string()),
        status: PrescriptionStatus::Active,
    }
}

pub fn message() -> Message {
    let appointment = appointment();
    Message {
        id: MessageId::new("msg-0001"),
        sender: Participant::new(appointment.patient_id.as_str(), Role::Patient),
        receiver: Participant::new(appointment.doctor_id.as_str(), Role::Doctor),
        content: "Doutora, posso tomar o remédio à noite?".to_string(),
        timestamp: Utc.with_ymd_and_hms(2024, 3, 5, 18, 30, 0).unwrap(),
        read: false,
        appointment_id: Some(appointment.id),
    }
}

pub fn session() -> ConsultationSession {
    let appointment = appointment();
    ConsultationSession {
        id: SessionId::new("ses-0001"),
        appointment_id: appointment.id,
        patient_id: appointment.patient_id,
        doctor_id: appointment.doctor_id,
        start_time: Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap(),
        end_time: None,
        status: SessionStatus::Waiting,
        modality: appointment.modality,
        notes: None,
    }
}

pub fn payment() -> Payment {
    let appointment = appointment();
    Payment {
        id: PaymentId::new("pay-0001"),
        appointment_id: appointment.id,
        patient_id: appointment.patient_id,
        doctor_id: appointment.doctor_id,
        amount: appointment.payment_amount,
        currency: "BRL".to_string(),
        status: PaymentStatus::Pending,
        timestamp: Utc.with_ymd_and_hms(2024, 3, 4, 8, 55, 0).unwrap(),
        method: PaymentMethod::CreditCard,
        transaction_id: None,
    }
}
