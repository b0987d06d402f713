// Known localization folders, grouped by language
//
// Each language lists every folder name variant seen in bundles: the ISO code,
// region/script variants and the legacy English names used by older apps.

/// A language and all of its `.lproj` folder aliases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    pub code: &'static str,
    pub name: &'static str,
    pub folders: &'static [&'static str],
}

pub const KNOWN_LANGUAGES: &[Language] = &[
    Language {
        code: "en",
        name: "English",
        folders: &[
            "en.lproj",
            "English.lproj",
            "en_US.lproj",
            "en_GB.lproj",
            "en_AU.lproj",
            "en_CA.lproj",
            "Base.lproj",
        ],
    },
    Language {
        code: "ar",
        name: "Arabic",
        folders: &["ar.lproj", "Arabic.lproj"],
    },
    Language {
        code: "ca",
        name: "Catalan",
        folders: &["ca.lproj", "Catalan.lproj"],
    },
    Language {
        code: "cs",
        name: "Czech",
        folders: &["cs.lproj", "cs_CZ.lproj", "Czech.lproj"],
    },
    Language {
        code: "da",
        name: "Danish",
        folders: &["da.lproj", "da_DK.lproj", "Danish.lproj"],
    },
    Language {
        code: "de",
        name: "German",
        folders: &[
            "de.lproj",
            "de_DE.lproj",
            "de_AT.lproj",
            "de_CH.lproj",
            "German.lproj",
        ],
    },
    Language {
        code: "el",
        name: "Greek",
        folders: &["el.lproj", "el_GR.lproj", "Greek.lproj"],
    },
    Language {
        code: "es",
        name: "Spanish",
        folders: &[
            "es.lproj",
            "es_ES.lproj",
            "es_MX.lproj",
            "es_419.lproj",
            "Spanish.lproj",
        ],
    },
    Language {
        code: "fa",
        name: "Persian",
        folders: &["fa.lproj", "Farsi.lproj"],
    },
    Language {
        code: "fi",
        name: "Finnish",
        folders: &["fi.lproj", "fi_FI.lproj", "Finnish.lproj"],
    },
    Language {
        code: "fr",
        name: "French",
        folders: &[
            "fr.lproj",
            "fr_FR.lproj",
            "fr_CA.lproj",
            "fr_CH.lproj",
            "French.lproj",
        ],
    },
    Language {
        code: "he",
        name: "Hebrew",
        folders: &["he.lproj", "he_IL.lproj", "Hebrew.lproj"],
    },
    Language {
        code: "hi",
        name: "Hindi",
        folders: &["hi.lproj", "Hindi.lproj"],
    },
    Language {
        code: "hr",
        name: "Croatian",
        folders: &["hr.lproj", "Croatian.lproj"],
    },
    Language {
        code: "hu",
        name: "Hungarian",
        folders: &["hu.lproj", "hu_HU.lproj", "Hungarian.lproj"],
    },
    Language {
        code: "id",
        name: "Indonesian",
        folders: &["id.lproj", "Indonesian.lproj"],
    },
    Language {
        code: "is",
        name: "Icelandic",
        folders: &["is.lproj", "Icelandic.lproj"],
    },
    Language {
        code: "it",
        name: "Italian",
        folders: &["it.lproj", "it_IT.lproj", "Italian.lproj"],
    },
    Language {
        code: "ja",
        name: "Japanese",
        folders: &["ja.lproj", "ja_JP.lproj", "Japanese.lproj"],
    },
    Language {
        code: "ko",
        name: "Korean",
        folders: &["ko.lproj", "ko_KR.lproj", "Korean.lproj"],
    },
    Language {
        code: "ms",
        name: "Malay",
        folders: &["ms.lproj", "Malay.lproj"],
    },
    Language {
        code: "nb",
        name: "Norwegian",
        folders: &["nb.lproj", "no.lproj", "no_NO.lproj", "Norwegian.lproj"],
    },
    Language {
        code: "nl",
        name: "Dutch",
        folders: &["nl.lproj", "nl_NL.lproj", "Dutch.lproj"],
    },
    Language {
        code: "pl",
        name: "Polish",
        folders: &["pl.lproj", "pl_PL.lproj", "Polish.lproj"],
    },
    Language {
        code: "pt",
        name: "Portuguese",
        folders: &["pt.lproj", "pt_PT.lproj", "Portuguese.lproj"],
    },
    Language {
        code: "pt_BR",
        name: "Brazilian Portuguese",
        folders: &["pt_BR.lproj", "pt-BR.lproj"],
    },
    Language {
        code: "ro",
        name: "Romanian",
        folders: &["ro.lproj", "Romanian.lproj"],
    },
    Language {
        code: "ru",
        name: "Russian",
        folders: &["ru.lproj", "ru_RU.lproj", "Russian.lproj"],
    },
    Language {
        code: "sk",
        name: "Slovak",
        folders: &["sk.lproj", "Slovak.lproj"],
    },
    Language {
        code: "sl",
        name: "Slovenian",
        folders: &["sl.lproj", "Slovenian.lproj"],
    },
    Language {
        code: "sv",
        name: "Swedish",
        folders: &["sv.lproj", "sv_SE.lproj", "Swedish.lproj"],
    },
    Language {
        code: "th",
        name: "Thai",
        folders: &["th.lproj", "Thai.lproj"],
    },
    Language {
        code: "tr",
        name: "Turkish",
        folders: &["tr.lproj", "tr_TR.lproj", "Turkish.lproj"],
    },
    Language {
        code: "uk",
        name: "Ukrainian",
        folders: &["uk.lproj", "Ukrainian.lproj"],
    },
    Language {
        code: "vi",
        name: "Vietnamese",
        folders: &["vi.lproj", "Vietnamese.lproj"],
    },
    Language {
        code: "zh_Hans",
        name: "Simplified Chinese",
        folders: &[
            "zh_CN.lproj",
            "zh-Hans.lproj",
            "zh_Hans.lproj",
            "zh_SC.lproj",
        ],
    },
    Language {
        code: "zh_Hant",
        name: "Traditional Chinese",
        folders: &[
            "zh_TW.lproj",
            "zh-Hant.lproj",
            "zh_Hant.lproj",
            "zh_HK.lproj",
        ],
    },
];

/// Look up a language by code (e.g. `"fr"`)
pub fn language_by_code(code: &str) -> Option<&'static Language> {
    KNOWN_LANGUAGES.iter().find(|l| l.code == code)
}

/// Every known folder name
pub fn known_folders() -> impl Iterator<Item = &'static str> {
    KNOWN_LANGUAGES.iter().flat_map(|l| l.folders.iter().copied())
}
