//! Z-Stack status codes carried in `status` fields.

/// Firmware name for a status byte, or `UNKNOWN`.
pub fn status_name(code: u8) -> &'static str {
    match code {
        0x00 => "SUCCESS",
        0x01 => "FAILURE",
        0x02 => "INVALID_PARAMETER",
        0x03 => "INVALID_TASK",
        0x04 => "MSG_BUFFER_NOT_AVAIL",
        0x05 => "INVALID_MSG_POINTER",
        0x06 => "INVALID_EVENT_ID",
        0x07 => "INVALID_INTERRUPT_ID",
        0x08 => "NO_TIMER_AVAIL",
        0x09 => "NV_ITEM_UNINIT",
        0x0A => "NV_OPER_FAILED",
        0x0B => "INVALID_MEM_SIZE",
        0x0C => "NV_BAD_ITEM_LEN",
        0x10 => "MEM_ERROR",
        0x11 => "BUFFER_FULL",
        0x12 => "UNSUPPORTED_MODE",
        0x13 => "MAC_MEM_ERROR",
        0x80 => "ZDP_INVALID_REQTYPE",
        0x81 => "ZDP_DEVICE_NOT_FOUND",
        0x82 => "ZDP_INVALID_EP",
        0x83 => "ZDP_NOT_ACTIVE",
        0x84 => "ZDP_NOT_SUPPORTED",
        0x85 => "ZDP_TIMEOUT",
        0x86 => "ZDP_NO_MATCH",
        0x88 => "ZDP_NO_ENTRY",
        0x89 => "ZDP_NO_DESCRIPTOR",
        0x8A => "ZDP_INSUFFICIENT_SPACE",
        0x8B => "ZDP_NOT_PERMITTED",
        0x8C => "ZDP_TABLE_FULL",
        0x8D => "ZDP_NOT_AUTHORIZED",
        0x8E => "ZDP_BINDING_TABLE_FULL",
        0xA0 => "APS_FAIL",
        0xA1 => "APS_TABLE_FULL",
        0xA2 => "APS_ILLEGAL_REQUEST",
        0xA3 => "APS_INVALID_BINDING",
        0xA4 => "APS_UNSUPPORTED_ATTRIB",
        0xA5 => "APS_NOT_SUPPORTED",
        0xA6 => "APS_NO_ACK",
        0xA7 => "APS_DUPLICATE_ENTRY",
        0xA8 => "APS_NO_BOUND_DEVICE",
        0xA9 => "APS_NOT_ALLOWED",
        0xAA => "APS_NOT_AUTHENTICATED",
        0xB1 => "SEC_NO_KEY",
        0xB7 => "SEC_MAX_FRM_COUNT",
        0xC1 => "NWK_INVALID_PARAM",
        0xC2 => "NWK_INVALID_REQUEST",
        0xC3 => "NWK_NOT_PERMITTED",
        0xC4 => "NWK_STARTUP_FAILURE",
        0xC5 => "NWK_ALREADY_PRESENT",
        0xC6 => "NWK_SYNC_FAILURE",
        0xC7 => "NWK_TABLE_FULL",
        0xC8 => "NWK_UNKNOWN_DEVICE",
        0xC9 => "NWK_UNSUPPORTED_ATTRIBUTE",
        0xCA => "NWK_NO_NETWORKS",
        0xCB => "NWK_LEAVE_UNCONFIRMED",
        0xCC => "NWK_NO_ACK",
        0xCD => "NWK_NO_ROUTE",
        0xE1 => "MAC_CHANNEL_ACCESS_FAILURE",
        0xE9 => "MAC_NO_ACK",
        0xF0 => "MAC_TRANSACTION_EXPIRED",
        _ => "UNKNOWN",
    }
}

/// Human-readable description of a status byte.
pub fn status_message(code: u8) -> String {
    format!("{} (0x{code:02x})", status_name(code))
}
