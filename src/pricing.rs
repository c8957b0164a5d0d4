use bigdecimal::BigDecimal;

/// Scale of every stored currency amount and rating.
pub const CURRENCY_SCALE: i64 = 2;

pub fn line_total(unit_price: &BigDecimal, quantity: i32) -> BigDecimal {
    unit_price.clone() * BigDecimal::from(quantity)
}

/// Sum of `price * quantity` over the given lines, at currency scale.
pub fn total<'a, I>(lines: I) -> BigDecimal
where
    I: IntoIterator<Item = (&'a BigDecimal, i32)>,
{
    let sum = lines
        .into_iter()
        .fold(BigDecimal::from(0), |acc, (price, quantity)| {
            acc + line_total(price, quantity)
        });
    to_currency(sum)
}

pub fn to_currency(amount: BigDecimal) -> BigDecimal {
    amount.with_scale(CURRENCY_SCALE)
}

/// Mean rating rounded half away from zero to two decimals. No reviews rate `0.00`.
pub fn average_rating(rating_sum: i64, review_count: i64) -> BigDecimal {
    if review_count <= 0 {
        return to_currency(BigDecimal::from(0));
    }
    let hundredths = (rating_sum * 200 + review_count) / (review_count * 2);
    to_currency(BigDecimal::from(hundredths) / BigDecimal::from(100))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(value: &str) -> BigDecimal {
        BigDecimal::from_str(value).unwrap()
    }

    #[test]
    fn total_is_exact_for_cents() {
        let ten = dec("10.00");
        let five_fifty = dec("5.50");
        let sum = total([(&ten, 2), (&five_fifty, 1)]);
        assert_eq!(sum, dec("25.50"));
        assert_eq!(sum.to_string(), "25.50");
    }

    #[test]
    fn total_of_nothing_is_zero() {
        assert_eq!(total(std::iter::empty()), dec("0.00"));
    }

    #[test]
    fn ten_cent_sums_do_not_drift() {
        let dime = dec("0.10");
        assert_eq!(total([(&dime, 3)]), dec("0.30"));
    }

    #[test]
    fn average_rating_rounds_half_up() {
        assert_eq!(average_rating(7, 2), dec("3.50"));
        assert_eq!(average_rating(10, 3), dec("3.33"));
        assert_eq!(average_rating(5, 3), dec("1.67"));
        assert_eq!(average_rating(5, 1), dec("5.00"));
    }

    #[test]
    fn average_rating_without_reviews_is_zero() {
        assert_eq!(average_rating(0, 0), dec("0.00"));
    }
}
