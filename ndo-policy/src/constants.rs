//! Enumeration tables mapping user-facing choices to wire values.

use ndo_core::schema::Translation;

pub static CIPHER_SUITE: Translation = Translation {
    entries: &[
        ("128_gcm_aes", "128GcmAes"),
        ("128_gcm_aes_xpn", "128GcmAesXpn"),
        ("256_gcm_aes", "256GcmAes"),
        ("256_gcm_aes_xpn", "256GcmAesXpn"),
    ],
};

pub static SECURITY_POLICY: Translation = Translation {
    entries: &[("should_secure", "shouldSecure"), ("must_secure", "mustSecure")],
};

pub static CONFIDENTIALITY_OFFSET: Translation = Translation {
    entries: &[("0", "offset0"), ("30", "offset30"), ("50", "offset50")],
};

pub static SYNC_E_QUALITY_LEVEL: Translation = Translation {
    entries: &[
        ("option_1", "op1"),
        ("option_2_generation_1", "op2g1"),
        ("option_2_generation_2", "op2g2"),
    ],
};

/// PTP priority 1 is not user settable.
pub const PTP_PRIORITY_1: i64 = 128;
