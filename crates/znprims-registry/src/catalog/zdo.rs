use znprims_frame::Subsystem::Zdo;

use crate::definition::CommandDefinition as Def;
use crate::field::FieldDef as F;

const STATUS: &[F] = &[F::u8("status")];

const ADDR_RSP: &[F] = &[
    F::u8("status"),
    F::ieee("ieeeaddr"),
    F::nwk("nwkaddr"),
    F::u8("startindex"),
    F::u8("numassocdev"),
    F::list_u16("assocdevlist", "numassocdev"),
];

const SRC_STATUS: &[F] = &[F::nwk("srcaddr"), F::u8("status")];

pub static ZDO: &[Def] = &[
    Def::sreq(
        Zdo,
        "nwkAddrReq",
        0x00,
        &[F::ieee("ieeeaddr"), F::u8("reqtype"), F::u8("startindex")],
        STATUS,
    ),
    Def::sreq(
        Zdo,
        "ieeeAddrReq",
        0x01,
        &[F::nwk("shortaddr"), F::u8("reqtype"), F::u8("startindex")],
        STATUS,
    ),
    Def::sreq(
        Zdo,
        "nodeDescReq",
        0x02,
        &[F::nwk("dstaddr"), F::nwk("nwkaddrofinterest")],
        STATUS,
    ),
    Def::sreq(
        Zdo,
        "simpleDescReq",
        0x04,
        &[
            F::nwk("dstaddr"),
            F::nwk("nwkaddrofinterest"),
            F::u8("endpoint"),
        ],
        STATUS,
    ),
    Def::sreq(
        Zdo,
        "activeEpReq",
        0x05,
        &[F::nwk("dstaddr"), F::nwk("nwkaddrofinterest")],
        STATUS,
    ),
    Def::sreq(
        Zdo,
        "mgmtLeaveReq",
        0x34,
        &[
            F::nwk("dstaddr"),
            F::ieee("deviceaddress"),
            F::u8("removechildren_rejoin"),
        ],
        STATUS,
    ),
    Def::sreq(
        Zdo,
        "mgmtPermitJoinReq",
        0x36,
        &[
            F::address_short("dstaddr"),
            F::u8("duration"),
            F::u8("tcsignificance"),
        ],
        STATUS,
    ),
    Def::sreq(Zdo, "startupFromApp", 0x40, &[F::u16("startdelay")], STATUS),
    Def::areq(Zdo, "nwkAddrRsp", 0x80, ADDR_RSP),
    Def::areq(Zdo, "ieeeAddrRsp", 0x81, ADDR_RSP),
    Def::areq(
        Zdo,
        "nodeDescRsp",
        0x82,
        &[
            F::nwk("srcaddr"),
            F::u8("status"),
            F::nwk("nwkaddr"),
            F::u8("logicaltype_cmplxdescavai_userdescavai"),
            F::u8("apsflags_freqband"),
            F::u8("maccapflags"),
            F::u16("manufacturercode"),
            F::u8("maxbuffersize"),
            F::u16("maxintransfersize"),
            F::u16("servermask"),
            F::u16("maxouttransfersize"),
            F::u8("descriptorcap"),
        ],
    ),
    Def::areq(
        Zdo,
        "simpleDescRsp",
        0x84,
        &[
            F::nwk("srcaddr"),
            F::u8("status"),
            F::nwk("nwkaddr"),
            F::u8("len"),
            F::u8("endpoint"),
            F::u16("profileid"),
            F::u16("deviceid"),
            F::u8("deviceversion"),
            F::u8("numinclusters"),
            F::list_u16("inclusterlist", "numinclusters"),
            F::u8("numoutclusters"),
            F::list_u16("outclusterlist", "numoutclusters"),
        ],
    ),
    Def::areq(
        Zdo,
        "activeEpRsp",
        0x85,
        &[
            F::nwk("srcaddr"),
            F::u8("status"),
            F::nwk("nwkaddr"),
            F::u8("activeepcount"),
            F::list_u8("activeeplist", "activeepcount"),
        ],
    ),
    Def::areq(Zdo, "mgmtLeaveRsp", 0xB4, SRC_STATUS),
    Def::areq(Zdo, "mgmtPermitJoinRsp", 0xB6, SRC_STATUS),
    Def::areq(Zdo, "stateChangeInd", 0xC0, &[F::u8("state")]),
    Def::areq(
        Zdo,
        "endDeviceAnnceInd",
        0xC1,
        &[
            F::nwk("srcaddr"),
            F::nwk("nwkaddr"),
            F::ieee("ieeeaddr"),
            F::u8("capabilities"),
        ],
    ),
    Def::areq(
        Zdo,
        "leaveInd",
        0xC9,
        &[
            F::nwk("srcaddr"),
            F::ieee("extaddr"),
            F::u8("request"),
            F::u8("removechildren"),
            F::u8("rejoin"),
        ],
    ),
    Def::areq(
        Zdo,
        "tcDeviceInd",
        0xCA,
        &[F::nwk("nwkaddr"), F::ieee("extaddr"), F::nwk("parentaddr")],
    ),
    Def::areq(Zdo, "permitJoinInd", 0xCB, &[F::u8("duration")]),
];
