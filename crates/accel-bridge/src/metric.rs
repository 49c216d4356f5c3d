// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Derived metrics.

/// Euclidean norm of an acceleration vector (total g).
///
/// Plain IEEE-754 arithmetic: a NaN component yields NaN, an infinite
/// component yields infinity.
pub fn magnitude(x: f64, y: f64, z: f64) -> f64 {
    (x * x + y * y + z * z).sqrt()
}
