// src/common/dates.rs
//
// Helpers de calendário do ciclo de compra e do agendamento de assinaturas.

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};

use crate::models::subscriptions::SubscriptionFrequency;

/// Próxima quinta-feira a partir de `from` (a própria data, se já for quinta).
/// As compras coletivas no mercado acontecem sempre às quintas.
pub fn next_thursday(from: NaiveDate) -> NaiveDate {
    let days_until = (Weekday::Thu.num_days_from_monday() + 7
        - from.weekday().num_days_from_monday())
        % 7;
    from + Days::new(days_until as u64)
}

/// Número da semana ISO-8601 (a semana que contém a primeira quinta do ano é a 1).
pub fn iso_week_number(date: NaiveDate) -> i32 {
    date.iso_week().week() as i32
}

/// Avança uma data pelo incremento da frequência da assinatura.
/// Sempre calculado a partir da data anterior do cursor, nunca de "hoje",
/// para não derrapar o cronograma quando o job roda atrasado.
pub fn advance_by_frequency(date: NaiveDate, frequency: SubscriptionFrequency) -> NaiveDate {
    match frequency {
        SubscriptionFrequency::Weekly => date + Days::new(7),
        SubscriptionFrequency::Biweekly => date + Days::new(14),
        SubscriptionFrequency::Monthly => date + Months::new(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_next_thursday_on_a_thursday_is_itself() {
        // 2026-02-05 é quinta-feira
        assert_eq!(next_thursday(d(2026, 2, 5)), d(2026, 2, 5));
    }

    #[test]
    fn test_next_thursday_from_friday_rolls_a_week() {
        assert_eq!(next_thursday(d(2026, 2, 6)), d(2026, 2, 12));
    }

    #[test]
    fn test_next_thursday_from_monday() {
        // 2026-02-02 é segunda
        assert_eq!(next_thursday(d(2026, 2, 2)), d(2026, 2, 5));
    }

    #[test]
    fn test_iso_week_number() {
        // 2026-01-01 é quinta, portanto semana 1
        assert_eq!(iso_week_number(d(2026, 1, 1)), 1);
        assert_eq!(iso_week_number(d(2026, 2, 5)), 6);
    }

    #[test]
    fn test_advance_weekly() {
        assert_eq!(
            advance_by_frequency(d(2026, 2, 5), SubscriptionFrequency::Weekly),
            d(2026, 2, 12)
        );
    }

    #[test]
    fn test_advance_biweekly() {
        assert_eq!(
            advance_by_frequency(d(2026, 2, 5), SubscriptionFrequency::Biweekly),
            d(2026, 2, 19)
        );
    }

    #[test]
    fn test_advance_monthly_is_a_calendar_month() {
        assert_eq!(
            advance_by_frequency(d(2026, 2, 5), SubscriptionFrequency::Monthly),
            d(2026, 3, 5)
        );
        // Fim de mês: 31/jan + 1 mês cai no último dia de fevereiro
        assert_eq!(
            advance_by_frequency(d(2026, 1, 31), SubscriptionFrequency::Monthly),
            d(2026, 2, 28)
        );
    }

    #[test]
    fn test_advance_is_strictly_monotonic_for_every_frequency() {
        // O cursor da assinatura nunca pode repetir nem voltar uma data,
        // senão o job diário regera o mesmo ciclo indefinidamente. Varre um
        // ano inteiro, incluindo viradas de mês e de ano.
        let frequencies = [
            SubscriptionFrequency::Weekly,
            SubscriptionFrequency::Biweekly,
            SubscriptionFrequency::Monthly,
        ];
        for frequency in frequencies {
            let mut cursor = d(2026, 1, 1);
            for _ in 0..60 {
                let next = advance_by_frequency(cursor, frequency);
                assert!(next > cursor, "{frequency:?}: {next} não avança de {cursor}");
                cursor = next;
            }
        }
    }

    #[test]
    fn test_advance_is_deterministic_for_rerun() {
        // Reprocessar o mesmo cursor produz o mesmo próximo vencimento.
        let cursor = d(2026, 2, 5);
        for frequency in [
            SubscriptionFrequency::Weekly,
            SubscriptionFrequency::Biweekly,
            SubscriptionFrequency::Monthly,
        ] {
            assert_eq!(
                advance_by_frequency(cursor, frequency),
                advance_by_frequency(cursor, frequency)
            );
        }
    }
}
