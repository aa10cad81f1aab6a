use znprims_frame::Subsystem::Util;

use crate::definition::CommandDefinition as Def;
use crate::field::FieldDef as F;

pub static UTIL: &[Def] = &[
    Def::sreq(
        Util,
        "getDeviceInfo",
        0x00,
        &[],
        &[
            F::u8("status"),
            F::ieee("ieeeaddr"),
            F::nwk("shortaddr"),
            F::u8("devicetype"),
            F::u8("devicestate"),
            F::u8("numassocdevices"),
            F::list_u16("assocdeviceslist", "numassocdevices"),
        ],
    ),
    Def::sreq(
        Util,
        "ledControl",
        0x0A,
        &[F::u8("ledid"), F::u8("mode")],
        &[F::u8("status")],
    ),
];
