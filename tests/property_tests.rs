use laundry_api::services::orders::compute_total;
use proptest::prelude::*;
use rust_decimal::Decimal;

fn price() -> impl Strategy<Value = Decimal> {
    // 0.01 to 9,999.99 per kilogram
    (1i64..1_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn kilograms() -> impl Strategy<Value = Decimal> {
    // 0.001 to 500.000 kg
    (1i64..500_000).prop_map(|grams| Decimal::new(grams, 3))
}

proptest! {
    #[test]
    fn total_is_price_times_weight_to_the_centavo(price in price(), kg in kilograms()) {
        let total = compute_total(price, kg).unwrap();
        prop_assert!(total.scale() <= 2);
        prop_assert!((total - price * kg).abs() <= Decimal::new(5, 3));
    }

    #[test]
    fn total_is_never_negative_and_grows_with_weight(price in price(), kg in kilograms(), extra in kilograms()) {
        let base = compute_total(price, kg).unwrap();
        prop_assert!(base >= Decimal::ZERO);
        prop_assert!(compute_total(price, kg + extra).unwrap() >= base);
    }

    #[test]
    fn whole_kilograms_are_exact(price in price(), kg in 1i64..200) {
        prop_assert_eq!(compute_total(price, Decimal::from(kg)).unwrap(), price * Decimal::from(kg));
    }
}
