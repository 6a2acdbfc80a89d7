//! Static lookup tables shared by the text normalizer and query rewriter.
//!
//! Every map here is a plain `&'static [(&str, ...)]` slice rather than a
//! generated `HashMap`, since lookups are a handful of `contains`/`find`
//! scans over short queries, not a hot path that needs O(1) dispatch.

/// Chinese file-type phrases -> canonical `file_type` tag. Longer, more
/// specific phrases are listed first; the rewriter prefers the longest
/// match present in the query rather than the first dictionary entry.
pub const FILE_TYPE_PHRASES: &[(&str, &str)] = &[
    ("图片类文件", "image"),
    ("视频文件", "video"),
    ("音频文件", "audio"),
    ("字幕文件", "subtitle"),
    ("图片文件", "image"),
    ("压缩文件", "archive"),
    ("压缩包", "archive"),
    ("视频", "video"),
    ("音频", "audio"),
    ("图片", "image"),
];

/// Chinese genre keyword -> `(zh_tag, en_tag)`.
pub const GENRE_WORDS: &[(&str, &str, &str)] = &[
    ("惊悚", "惊悚", "Thriller"),
    ("恐怖", "恐怖", "Horror"),
    ("悬疑", "悬疑", "Mystery"),
    ("动作", "动作", "Action"),
    ("科幻", "科幻", "Science Fiction"),
    ("犯罪", "犯罪", "Crime"),
    ("爱情", "爱情", "Romance"),
    ("喜剧", "喜剧", "Comedy"),
    ("剧情", "剧情", "Drama"),
    ("冒险", "冒险", "Adventure"),
    ("动画", "动画", "Animation"),
    ("奇幻", "奇幻", "Fantasy"),
    ("战争", "战争", "War"),
    ("纪录", "纪录", "Documentary"),
    ("家庭", "家庭", "Family"),
    ("音乐", "音乐", "Music"),
    ("历史", "历史", "History"),
    ("西部", "西部", "Western"),
];

/// Language code -> keyword tokens (Chinese + English names, abbreviations).
pub const LANGUAGE_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "zh",
        &[
            "中文", "国语", "简体", "繁体", "中字", "chinese", "chs", "cht", "chi", "mandarin",
        ],
    ),
    ("en", &["英文", "英语", "english", "eng"]),
    ("jp", &["日语", "日文", "japanese", "jpn"]),
    ("kr", &["韩语", "韩文", "korean", "kor"]),
    ("fr", &["法语", "french", "fre"]),
    ("de", &["德语", "german", "ger"]),
    ("es", &["西语", "西班牙", "spanish", "spa"]),
    ("ru", &["俄语", "russian", "rus"]),
];

/// Tokens that, if present, mark a language hit as subtitle rather than audio.
pub const SUBTITLE_MARKER_TOKENS: &[&str] = &["字幕", "中字", "双语", "sub", "subs", "subtitle"];

/// Domain synonym expansion: a matched token contributes these extra search terms.
pub const SYNONYM_EXPANSIONS: &[(&str, &[&str])] = &[
    ("电影", &["影片", "movie", "film"]),
    ("影片", &["电影", "movie", "film"]),
    ("惊悚", &["thriller", "紧张"]),
    ("恐怖", &["horror", "恐怖片"]),
    ("悬疑", &["mystery", "疑案"]),
    ("爱情", &["romance"]),
    ("喜剧", &["comedy"]),
    ("科幻", &["sci-fi", "science fiction"]),
    ("动作", &["action"]),
    ("战争", &["war"]),
    ("动画", &["animation", "cartoon"]),
    ("纪录", &["documentary", "doc"]),
    ("犯罪", &["crime"]),
    ("奇幻", &["fantasy"]),
    ("冒险", &["adventure"]),
    ("剧情", &["drama"]),
    ("家庭", &["family"]),
    ("音乐", &["music"]),
    ("传记", &["biography", "biopic"]),
    ("历史", &["history"]),
    ("西部", &["western"]),
    ("体育", &["sport", "sports"]),
    ("真人秀", &["reality"]),
    ("综艺", &["variety"]),
    ("剧集", &["series", "tv", "show"]),
    ("电视剧", &["tv", "series", "drama"]),
];

/// Technical release-noise tokens stripped from raw catalog text before
/// it reaches the embedder (resolution, codec, container, release-group
/// jargon). Matched case-insensitively on word boundaries.
pub const RELEASE_NOISE_TOKENS: &[&str] = &[
    r"\d{3,4}p", "4k", "8k", "uhd", "hdr", "hdr10", "dolby", "dv", "x264", "x265",
    r"h\.?26[45]", "hevc", "avc", "bluray", r"blu-?ray", r"web-?dl", r"web-?rip", "brrip",
    "dvdrip", "hdrip", "remux", "aac", "dts", "truehd", "atmos", "flac", "mp3", "mkv", "mp4",
    "avi", "ts", "m2ts", "srt", "ass", "vtt", "sub", "subs", "torrent", "seed", "complete",
    "proper", "repack", "extended", "uncut", "multi", "dual",
];

/// Generic media-type filler words: they classify "this is a movie" rather
/// than describe content, so the query rewriter strips them from the
/// cleaned keyword query (they still drive synonym expansion separately).
pub const STRUCTURAL_FILLER_WORDS: &[&str] = &["电影", "影片"];

/// Retrieval prefix prepended to queries for BGE-family embedding models.
pub const BGE_QUERY_PREFIX: &str = "为这个句子生成表示以用于检索相关文章：";

/// Known size fields scanned in priority order when deriving a record's size.
pub const SIZE_FIELDS: &[&str] = &[
    "size",
    "total_size",
    "torrent_size",
    "content_size",
    "files_size",
    "file_size",
    "length",
];
