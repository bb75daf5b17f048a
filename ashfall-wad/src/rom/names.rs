//! Fixed name tables for the ROM directory.
//!
//! The ROM's directory is flat and mostly bracketed by `T_START`/`S_START`
//! markers, but a handful of lumps live outside any bracket and still need
//! special decoding. These tables pin them to the right lump kind.

/// Graphics lumps that are not inside a graphics bracket. In sorted order.
pub(crate) const GFX_NAMES: [&str; 15] = [
    "CLOUD", "EVIL", "FINAL", "FIRE",
    "IDCRED1", "IDCRED2", "JAPFONT", "JPCPAK",
    "JPLEGAL", "PLLEGAL", "SYMBOLS", "TITLE",
    "USLEGAL", "WMSCRED1", "WMSCRED2",
];

/// Graphics lumps that use the sprite format. In sorted order.
pub(crate) const GFX_SPRITES: [&str; 50] = [
    "JPMSG01", "JPMSG02", "JPMSG03", "JPMSG04",
    "JPMSG05", "JPMSG06", "JPMSG07", "JPMSG08",
    "JPMSG09", "JPMSG10", "JPMSG11", "JPMSG12",
    "JPMSG13", "JPMSG14", "JPMSG15", "JPMSG16",
    "JPMSG18", "JPMSG19", "JPMSG20", "JPMSG21",
    "JPMSG22", "JPMSG23", "JPMSG24", "JPMSG25",
    "JPMSG26", "JPMSG27", "JPMSG28", "JPMSG29",
    "JPMSG30", "JPMSG31", "JPMSG32", "JPMSG33",
    "JPMSG34", "JPMSG35", "JPMSG36", "JPMSG37",
    "JPMSG38", "JPMSG39", "JPMSG40", "JPMSG41",
    "JPMSG42", "JPMSG43", "JPMSG44", "JPMSG45",
    "MOUNTA",  "MOUNTB",  "MOUNTC",  "SFONT",
    "SPACE",   "STATUS",
];

/// Sound and music lumps, appended after the directory scan in this order;
/// their position here is the track index handed to the sound bank.
pub(crate) const SND_NAMES: [&str; 117] = [
    "NOSOUND",  "SNDPUNCH", "SNDSPAWN", "SNDEXPLD",
    "SNDIMPCT", "SNDPSTOL", "SNDSHTGN", "SNDPLSMA",
    "SNDBFG",   "SNDSAWUP", "SNDSWIDL", "SNDSAW1",
    "SNDSAW2",  "SNDMISLE", "SNDBFGXP", "SNDPSTRT",
    "SNDPSTOP", "SNDDORUP", "SNDDORDN", "SNDSCMOV",
    "SNDSWCH1", "SNDSWCH2", "SNDITEM",  "SNDSGCK",
    "SNDOOF1",  "SNDTELPT", "SNDOOF2",  "SNDSHT2F",
    "SNDLOAD1", "SNDLOAD2", "SNDPPAIN", "SNDPLDIE",
    "SNDSLOP",  "SNDZSIT1", "SNDZSIT2", "SNDZSIT3",
    "SNDZDIE1", "SNDZDIE2", "SNDZDIE3", "SNDZACT",
    "SNDPAIN1", "SNDPAIN2", "SNDDBACT", "SNDSCRCH",
    "SNDISIT1", "SNDISIT2", "SNDIDIE1", "SNDIDIE2",
    "SNDIACT",  "SNDSGSIT", "SNDSGATK", "SNDSGDIE",
    "SNDB1SIT", "SNDB1DIE", "SNDHDSIT", "SNDHDDIE",
    "SNDSKATK", "SNDB2SIT", "SNDB2DIE", "SNDPESIT",
    "SNDPEPN",  "SNDPEDIE", "SNDBSSIT", "SNDBSDIE",
    "SNDBSLFT", "SNDBSSMP", "SNDFTATK", "SNDFTSIT",
    "SNDFTHIT", "SNDFTDIE", "SNDBDMSL", "SNDRVACT",
    "SNDTRACR", "SNDDART",  "SNDRVHIT", "SNDCYSIT",
    "SNDCYDTH", "SNDCYHOF", "SNDMETAL", "SNDDOR2U",
    "SNDDOR2D", "SNDPWRUP", "SNDLASER", "SNDBUZZ",
    "SNDTHNDR", "SNDLNING", "SNDQUAKE", "SNDDRTHT",
    "SNDRCACT", "SNDRCATK", "SNDRCDIE", "SNDRCPN",
    "SNDRCSIT", "MUSAMB01", "MUSAMB02", "MUSAMB03",
    "MUSAMB04", "MUSAMB05", "MUSAMB06", "MUSAMB07",
    "MUSAMB08", "MUSAMB09", "MUSAMB10", "MUSAMB11",
    "MUSAMB12", "MUSAMB13", "MUSAMB14", "MUSAMB15",
    "MUSAMB16", "MUSAMB17", "MUSAMB18", "MUSAMB19",
    "MUSAMB20", "MUSFINAL", "MUSDONE",  "MUSINTRO",
    "MUSTITLE",
];
