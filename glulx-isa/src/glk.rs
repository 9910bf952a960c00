//! Numeric selectors of the Glk dispatch boundary.
//!
//! The interpreter communicates with its presentation provider solely by
//! these selectors; the values are the stable dispatch numbers of the Glk
//! API. Providers are free to answer any subset and return 0 for the rest.

/// `glk_exit`
pub const EXIT: u32 = 0x0001;
/// `glk_tick`
pub const TICK: u32 = 0x0003;
/// `glk_gestalt`
pub const GESTALT: u32 = 0x0004;
/// `glk_gestalt_ext`
pub const GESTALT_EXT: u32 = 0x0005;

/// `glk_window_iterate`
pub const WINDOW_ITERATE: u32 = 0x0020;
/// `glk_window_get_rock`
pub const WINDOW_GET_ROCK: u32 = 0x0021;
/// `glk_window_get_root`
pub const WINDOW_GET_ROOT: u32 = 0x0022;
/// `glk_window_open`
pub const WINDOW_OPEN: u32 = 0x0023;
/// `glk_window_close`
pub const WINDOW_CLOSE: u32 = 0x0024;
/// `glk_window_get_size`
pub const WINDOW_GET_SIZE: u32 = 0x0025;
/// `glk_window_get_type`
pub const WINDOW_GET_TYPE: u32 = 0x0028;
/// `glk_window_get_parent`
pub const WINDOW_GET_PARENT: u32 = 0x0029;
/// `glk_window_clear`
pub const WINDOW_CLEAR: u32 = 0x002A;
/// `glk_window_move_cursor`
pub const WINDOW_MOVE_CURSOR: u32 = 0x002B;
/// `glk_window_get_stream`
pub const WINDOW_GET_STREAM: u32 = 0x002C;
/// `glk_set_window`
pub const SET_WINDOW: u32 = 0x002F;

/// `glk_stream_iterate`
pub const STREAM_ITERATE: u32 = 0x0040;
/// `glk_stream_get_rock`
pub const STREAM_GET_ROCK: u32 = 0x0041;
/// `glk_stream_open_file`
pub const STREAM_OPEN_FILE: u32 = 0x0042;
/// `glk_stream_open_memory`
pub const STREAM_OPEN_MEMORY: u32 = 0x0043;
/// `glk_stream_close`
pub const STREAM_CLOSE: u32 = 0x0044;
/// `glk_stream_set_position`
pub const STREAM_SET_POSITION: u32 = 0x0045;
/// `glk_stream_get_position`
pub const STREAM_GET_POSITION: u32 = 0x0046;
/// `glk_stream_set_current`
pub const STREAM_SET_CURRENT: u32 = 0x0047;
/// `glk_stream_get_current`
pub const STREAM_GET_CURRENT: u32 = 0x0048;

/// `glk_fileref_create_temp`
pub const FILEREF_CREATE_TEMP: u32 = 0x0060;
/// `glk_fileref_create_by_name`
pub const FILEREF_CREATE_BY_NAME: u32 = 0x0061;
/// `glk_fileref_create_by_prompt`
pub const FILEREF_CREATE_BY_PROMPT: u32 = 0x0062;
/// `glk_fileref_destroy`
pub const FILEREF_DESTROY: u32 = 0x0063;
/// `glk_fileref_iterate`
pub const FILEREF_ITERATE: u32 = 0x0064;
/// `glk_fileref_delete_file`
pub const FILEREF_DELETE_FILE: u32 = 0x0066;
/// `glk_fileref_does_file_exist`
pub const FILEREF_DOES_FILE_EXIST: u32 = 0x0067;

/// `glk_put_char`
pub const PUT_CHAR: u32 = 0x0080;
/// `glk_put_char_stream`
pub const PUT_CHAR_STREAM: u32 = 0x0081;
/// `glk_put_string`
pub const PUT_STRING: u32 = 0x0082;
/// `glk_put_string_stream`
pub const PUT_STRING_STREAM: u32 = 0x0083;
/// `glk_put_buffer`
pub const PUT_BUFFER: u32 = 0x0084;
/// `glk_put_buffer_stream`
pub const PUT_BUFFER_STREAM: u32 = 0x0085;
/// `glk_set_style`
pub const SET_STYLE: u32 = 0x0086;

/// `glk_get_char_stream`
pub const GET_CHAR_STREAM: u32 = 0x0090;
/// `glk_get_line_stream`
pub const GET_LINE_STREAM: u32 = 0x0091;
/// `glk_get_buffer_stream`
pub const GET_BUFFER_STREAM: u32 = 0x0092;

/// `glk_char_to_lower`
pub const CHAR_TO_LOWER: u32 = 0x00A0;
/// `glk_char_to_upper`
pub const CHAR_TO_UPPER: u32 = 0x00A1;

/// `glk_select`
pub const SELECT: u32 = 0x00C0;
/// `glk_select_poll`
pub const SELECT_POLL: u32 = 0x00C1;

/// `glk_request_line_event`
pub const REQUEST_LINE_EVENT: u32 = 0x00D0;
/// `glk_cancel_line_event`
pub const CANCEL_LINE_EVENT: u32 = 0x00D1;
/// `glk_request_char_event`
pub const REQUEST_CHAR_EVENT: u32 = 0x00D2;
/// `glk_cancel_char_event`
pub const CANCEL_CHAR_EVENT: u32 = 0x00D3;
/// `glk_request_timer_events`
pub const REQUEST_TIMER_EVENTS: u32 = 0x00D6;

/// `glk_put_char_uni`
pub const PUT_CHAR_UNI: u32 = 0x0128;
/// `glk_put_string_uni`
pub const PUT_STRING_UNI: u32 = 0x0129;
/// `glk_put_buffer_uni`
pub const PUT_BUFFER_UNI: u32 = 0x012A;
/// `glk_put_char_stream_uni`
pub const PUT_CHAR_STREAM_UNI: u32 = 0x012B;

/// `glk_request_char_event_uni`
pub const REQUEST_CHAR_EVENT_UNI: u32 = 0x0140;
/// `glk_request_line_event_uni`
pub const REQUEST_LINE_EVENT_UNI: u32 = 0x0141;

/// No event.
pub const EVTYPE_NONE: u32 = 0;
/// Timer tick.
pub const EVTYPE_TIMER: u32 = 1;
/// Character input completed.
pub const EVTYPE_CHAR_INPUT: u32 = 2;
/// Line input completed.
pub const EVTYPE_LINE_INPUT: u32 = 3;
/// Mouse click.
pub const EVTYPE_MOUSE_INPUT: u32 = 4;
/// Window arrangement changed.
pub const EVTYPE_ARRANGE: u32 = 5;
/// Window contents must be redrawn.
pub const EVTYPE_REDRAW: u32 = 6;
