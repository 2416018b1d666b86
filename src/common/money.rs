// src/common/money.rs

use rust_decimal::{Decimal, RoundingStrategy};

/// Arredonda para 2 casas (meio para cima), usado apenas nos valores gravados.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `base * percent / 100`, sem arredondar. `None` se estourar a faixa do `Decimal`.
pub fn percent_of(base: Decimal, percent: Decimal) -> Option<Decimal> {
    base.checked_mul(percent)?.checked_div(Decimal::ONE_HUNDRED)
}
