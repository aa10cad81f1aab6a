use znprims_frame::Subsystem::Af;

use crate::definition::CommandDefinition as Def;
use crate::field::FieldDef as F;

const STATUS: &[F] = &[F::u8("status")];

pub static AF: &[Def] = &[
    Def::sreq(
        Af,
        "register",
        0x00,
        &[
            F::u8("endpoint"),
            F::u16("appprofid"),
            F::u16("appdeviceid"),
            F::u8("appdevver"),
            F::u8("latencyreq"),
            F::u8("appnuminclusters"),
            F::list_u16("appinclusterlist", "appnuminclusters"),
            F::u8("appnumoutclusters"),
            F::list_u16("appoutclusterlist", "appnumoutclusters"),
        ],
        STATUS,
    ),
    Def::sreq(
        Af,
        "dataRequest",
        0x01,
        &[
            F::nwk("dstaddr"),
            F::u8("destendpoint"),
            F::u8("srcendpoint"),
            F::u16("clusterid"),
            F::u8("transid"),
            F::u8("options"),
            F::u8("radius"),
            F::u8("len"),
            F::buffer("data", "len"),
        ],
        STATUS,
    )
    .with_sequence("transid"),
    Def::sreq(
        Af,
        "dataRequestExt",
        0x02,
        &[
            F::address_wide("dstaddr"),
            F::u8("destendpoint"),
            F::u16("dstpanid"),
            F::u8("srcendpoint"),
            F::u16("clusterid"),
            F::u8("transid"),
            F::u8("options"),
            F::u8("radius"),
            F::u16("len"),
            F::buffer("data", "len"),
        ],
        STATUS,
    )
    .with_sequence("transid"),
    Def::areq(
        Af,
        "dataConfirm",
        0x80,
        &[F::u8("status"), F::u8("endpoint"), F::u8("transid")],
    )
    .with_sequence("transid"),
    Def::areq(
        Af,
        "incomingMsg",
        0x81,
        &[
            F::u16("groupid"),
            F::u16("clusterid"),
            F::nwk("srcaddr"),
            F::u8("srcendpoint"),
            F::u8("dstendpoint"),
            F::u8("wasbroadcast"),
            F::u8("linkquality"),
            F::u8("securityuse"),
            F::u32("timestamp"),
            F::u8("transseqnumber"),
            F::u8("len"),
            F::buffer("data", "len"),
        ],
    ),
    Def::areq(
        Af,
        "incomingMsgExt",
        0x82,
        &[
            F::u16("groupid"),
            F::u16("clusterid"),
            F::address_wide("srcaddr"),
            F::u8("srcendpoint"),
            F::u16("srcpanid"),
            F::u8("dstendpoint"),
            F::u8("wasbroadcast"),
            F::u8("linkquality"),
            F::u8("securityuse"),
            F::u32("timestamp"),
            F::u8("transseqnumber"),
            F::u16("len"),
            F::buffer("data", "len"),
        ],
    ),
];
