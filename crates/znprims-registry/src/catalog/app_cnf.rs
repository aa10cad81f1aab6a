use znprims_frame::Subsystem::AppConfig;

use crate::definition::CommandDefinition as Def;
use crate::field::FieldDef as F;

pub static APP_CNF: &[Def] = &[
    Def::sreq(
        AppConfig,
        "bdbStartCommissioning",
        0x05,
        &[F::u8("mode")],
        &[F::u8("status")],
    ),
    Def::sreq(
        AppConfig,
        "bdbSetChannel",
        0x08,
        &[F::u8("isPrimary"), F::u32("channel")],
        &[F::u8("status")],
    ),
    Def::areq(
        AppConfig,
        "bdbComissioningNotifcation",
        0x80,
        &[
            F::u8("status"),
            F::u8("commissioningmode"),
            F::u8("remainingcommissioningmodes"),
        ],
    ),
];
