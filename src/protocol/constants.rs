//! Engine wire constants.
//!
//! Values match the engine's public `ibase.h` / `consts_pub.h` headers.

// SQL wire types (sqltype with the nullable bit masked off)
pub const SQL_TEXT: u32 = 452;
pub const SQL_VARYING: u32 = 448;
pub const SQL_SHORT: u32 = 500;
pub const SQL_LONG: u32 = 496;
pub const SQL_FLOAT: u32 = 482;
pub const SQL_DOUBLE: u32 = 480;
pub const SQL_D_FLOAT: u32 = 530;
pub const SQL_TIMESTAMP: u32 = 510;
pub const SQL_BLOB: u32 = 520;
pub const SQL_ARRAY: u32 = 540;
pub const SQL_QUAD: u32 = 550;
pub const SQL_TYPE_TIME: u32 = 560;
pub const SQL_TYPE_DATE: u32 = 570;
pub const SQL_INT64: u32 = 580;
pub const SQL_TIMESTAMP_TZ_EX: u32 = 32748;
pub const SQL_TIME_TZ_EX: u32 = 32750;
pub const SQL_INT128: u32 = 32752;
pub const SQL_TIMESTAMP_TZ: u32 = 32754;
pub const SQL_TIME_TZ: u32 = 32756;
pub const SQL_DEC16: u32 = 32760;
pub const SQL_DEC34: u32 = 32762;
pub const SQL_BOOLEAN: u32 = 32764;
pub const SQL_NULL: u32 = 32766;

// Statement types (isc_info_sql_stmt_*)
pub const STMT_SELECT: u32 = 1;
pub const STMT_INSERT: u32 = 2;
pub const STMT_UPDATE: u32 = 3;
pub const STMT_DELETE: u32 = 4;
pub const STMT_DDL: u32 = 5;
pub const STMT_GET_SEGMENT: u32 = 6;
pub const STMT_PUT_SEGMENT: u32 = 7;
pub const STMT_EXEC_PROCEDURE: u32 = 8;
pub const STMT_START_TRANS: u32 = 9;
pub const STMT_COMMIT: u32 = 10;
pub const STMT_ROLLBACK: u32 = 11;
pub const STMT_SELECT_FOR_UPD: u32 = 12;
pub const STMT_SET_GENERATOR: u32 = 13;
pub const STMT_SAVEPOINT: u32 = 14;

// Prepare flags (IStatement::PREPARE_PREFETCH_*)
pub const PREPARE_PREFETCH_TYPE: u32 = 0x01;
pub const PREPARE_PREFETCH_INPUT_PARAMETERS: u32 = 0x02;
pub const PREPARE_PREFETCH_OUTPUT_PARAMETERS: u32 = 0x04;
pub const PREPARE_PREFETCH_LEGACY_PLAN: u32 = 0x08;
pub const PREPARE_PREFETCH_DETAILED_PLAN: u32 = 0x10;
pub const PREPARE_PREFETCH_METADATA: u32 =
    PREPARE_PREFETCH_TYPE | PREPARE_PREFETCH_INPUT_PARAMETERS | PREPARE_PREFETCH_OUTPUT_PARAMETERS;

// Cursor flags (IStatement::CURSOR_TYPE_*)
pub const CURSOR_TYPE_SCROLLABLE: u32 = 0x01;

pub const SQL_DIALECT_V6: u32 = 3;

// Status vector codes
pub const ISC_ARITH_EXCEPT: i64 = 335544321;
pub const ISC_STRING_TRUNCATION: i64 = 335544914;
pub const ISC_DSQL_ERROR: i64 = 335544569;
pub const ISC_DSQL_CURSOR_ERR: i64 = 335544572;
pub const ISC_BAD_STMT_HANDLE: i64 = 335544485;
pub const ISC_BAD_TRANS_HANDLE: i64 = 335544332;
pub const ISC_INVALID_FETCH_OPTION: i64 = 335545092;
pub const ISC_IO_ERROR: i64 = 335544344;
pub const ISC_INVALID_TIMEZONE_REGION: i64 = 335545097;
pub const ISC_BAD_DPB_FORM: i64 = 335544326;
pub const ISC_BAD_TPB_FORM: i64 = 335544378;
pub const ISC_DSQL_TABLE_UNKNOWN: i64 = 335544580;

// Database parameter block
pub const ISC_DPB_VERSION1: u8 = 1;
pub const ISC_DPB_USER_NAME: u8 = 28;
pub const ISC_DPB_PASSWORD: u8 = 29;
pub const ISC_DPB_LC_CTYPE: u8 = 48;
pub const ISC_DPB_SQL_ROLE_NAME: u8 = 60;

// Transaction parameter block
pub const ISC_TPB_VERSION3: u8 = 3;
pub const ISC_TPB_CONSISTENCY: u8 = 1;
pub const ISC_TPB_CONCURRENCY: u8 = 2;
pub const ISC_TPB_WAIT: u8 = 6;
pub const ISC_TPB_NOWAIT: u8 = 7;
pub const ISC_TPB_READ: u8 = 8;
pub const ISC_TPB_WRITE: u8 = 9;
pub const ISC_TPB_IGNORE_LIMBO: u8 = 14;
pub const ISC_TPB_READ_COMMITTED: u8 = 15;
pub const ISC_TPB_AUTOCOMMIT: u8 = 16;
pub const ISC_TPB_REC_VERSION: u8 = 17;
pub const ISC_TPB_NO_REC_VERSION: u8 = 18;
pub const ISC_TPB_RESTART_REQUESTS: u8 = 19;
pub const ISC_TPB_NO_AUTO_UNDO: u8 = 20;

// Calendar
/// Days between 1858-11-17 (engine epoch) and 1970-01-01.
pub const DATE_EPOCH_OFFSET_DAYS: i32 = 40587;
/// Time ticks per second (100 microsecond units).
pub const TIME_TICKS_PER_SECOND: u32 = 10_000;
pub const TIME_TICKS_PER_DAY: u32 = 86_400 * TIME_TICKS_PER_SECOND;

// Time zones
pub const TIME_ZONE_GMT: u16 = 65535;
pub const TIME_ZONE_UTC: u16 = 65534;
/// Offset zones are stored as `minutes + TIME_ZONE_OFFSET_BIAS`.
pub const TIME_ZONE_OFFSET_BIAS: i32 = 1439;
