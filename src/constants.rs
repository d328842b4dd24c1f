/// Avogadro's number (mol^-1)
pub const AVOGADRO: f64 = 6.02214076e23;

/// Neutron mass in unified atomic mass units; A = AWR * NEUTRON_MASS_AMU.
pub const NEUTRON_MASS_AMU: f64 = 1.00866491588;

/// One barn in cm^2
pub const BARN_CM2: f64 = 1.0e-24;

/// Lowest representable CT number (air)
pub const HU_MIN: f64 = -1000.0;

/// Highest representable CT number (12-bit window above -1000)
pub const HU_MAX: f64 = 3095.0;

/// Pixels darker than this are floored to air during image preparation.
pub const HU_AIR_FLOOR: f64 = -800.0;

/// Tube voltages accepted by the series-pairing classifier (kVp).
pub const LOW_KVP: f64 = 80.0;
pub const LOW_KVP_100: f64 = 100.0;
pub const HIGH_KVP: f64 = 140.0;

/// Tolerance used when matching a file's kVp tag against a tube class.
pub const KVP_TOLERANCE: f64 = 1.0e-8;
