// File: ./src/model/defaults.rs
//! Built-in sample dataset shown when neither the remote endpoint nor local
//! storage can provide anything usable (first run, offline, corrupted store).
use super::item::{Dataset, Event, HelpService, RecordStatus};

pub fn default_events() -> Vec<Event> {
    vec![
        Event {
            id: "sample-event-1".to_string(),
            title: "Инклюзивный концерт в парке".to_string(),
            date: "2025-06-14".to_string(),
            time: "18:00".to_string(),
            location: "Парк Горького, летняя сцена".to_string(),
            district: "ЦАО".to_string(),
            accessibility: "Пандус, места для колясок, сурдоперевод".to_string(),
            category: "Культура".to_string(),
            description: "Открытый концерт с сурдопереводом и тифлокомментированием.".to_string(),
            registration_link: String::new(),
            contact_name: "Анна".to_string(),
            contact_phone: "+7 999 000-00-01".to_string(),
            contact_methods: vec!["phone".to_string(), "whatsapp".to_string()],
            status: RecordStatus::Approved,
        },
        Event {
            id: "sample-event-2".to_string(),
            title: "Мастер-класс по адаптивному спорту".to_string(),
            date: "2025-06-21".to_string(),
            time: "11:30".to_string(),
            location: "Спортивный центр «Лужники»".to_string(),
            district: "ЗАО".to_string(),
            accessibility: "Доступная среда, сопровождение волонтёров".to_string(),
            category: "Спорт".to_string(),
            description: "Знакомство с бочча и настольным теннисом для всех уровней.".to_string(),
            registration_link: "https://example.org/register".to_string(),
            contact_name: "Игорь".to_string(),
            contact_phone: "+7 999 000-00-02".to_string(),
            contact_methods: vec!["phone".to_string()],
            status: RecordStatus::Approved,
        },
    ]
}

pub fn default_help() -> Vec<HelpService> {
    vec![
        HelpService {
            id: "sample-help-1".to_string(),
            org_name: "Социальное такси".to_string(),
            help_type: "Транспорт".to_string(),
            description: "Поездки к медицинским и социальным учреждениям.".to_string(),
            district: "Все округа".to_string(),
            contacts: "+7 495 000-00-00".to_string(),
            is_free: true,
            conditions: "Заявка за 2 дня, при наличии ИПРА".to_string(),
            status: RecordStatus::Approved,
        },
        HelpService {
            id: "sample-help-2".to_string(),
            org_name: "Юридическая клиника".to_string(),
            help_type: "Консультации".to_string(),
            description: "Помощь с оформлением льгот и обжалованием решений МСЭ.".to_string(),
            district: "САО".to_string(),
            contacts: "legal@example.org".to_string(),
            is_free: false,
            conditions: "Первая консультация бесплатно".to_string(),
            status: RecordStatus::Approved,
        },
    ]
}

pub fn default_dataset() -> Dataset {
    Dataset::new(default_events(), default_help())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_ids_unique_per_collection() {
        let data = default_dataset();
        assert!(!data.events.is_empty());
        assert!(!data.help.is_empty());

        let event_ids: HashSet<_> = data.events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(event_ids.len(), data.events.len());
        let help_ids: HashSet<_> = data.help.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(help_ids.len(), data.help.len());
    }

    #[test]
    fn test_default_dates_are_schema_shaped() {
        for e in default_events() {
            assert_eq!(e.date.len(), 10);
            assert_eq!(e.time.len(), 5);
        }
    }
}
