use znprims_frame::Subsystem::Sys;

use crate::definition::CommandDefinition as Def;
use crate::field::FieldDef as F;

pub static SYS: &[Def] = &[
    Def::areq(Sys, "resetReq", 0x00, &[F::u8("type")]),
    Def::sreq(Sys, "ping", 0x01, &[], &[F::u16("capabilities")]),
    Def::sreq(
        Sys,
        "version",
        0x02,
        &[],
        &[
            F::u8("transportrev"),
            F::u8("product"),
            F::u8("majorrel"),
            F::u8("minorrel"),
            F::u8("maintrel"),
            F::u32("revision"),
        ],
    ),
    Def::sreq(Sys, "getExtAddr", 0x04, &[], &[F::ieee("extaddress")]),
    Def::sreq(
        Sys,
        "osalNvRead",
        0x08,
        &[F::u16("id"), F::u8("offset")],
        &[F::u8("status"), F::u8("len"), F::buffer("value", "len")],
    ),
    Def::sreq(
        Sys,
        "osalNvWrite",
        0x09,
        &[
            F::u16("id"),
            F::u8("offset"),
            F::u8("len"),
            F::buffer("value", "len"),
        ],
        &[F::u8("status")],
    ),
    Def::areq(
        Sys,
        "resetInd",
        0x80,
        &[
            F::u8("reason"),
            F::u8("transportrev"),
            F::u8("productid"),
            F::u8("majorrel"),
            F::u8("minorrel"),
            F::u8("hwrev"),
        ],
    ),
];
