//! Built-in trigger phrases for every action, in several locales.
//!
//! The table is scanned top to bottom and the first entry with a phrase
//! contained in the transcript wins, so entry order is part of the contract:
//! an entry whose phrase is a substring of a later entry's phrase shadows it.
//! That is why `unmute` precedes `mute`, `exitFullscreen` precedes
//! `fullscreen`, the speed entries precede `play` ("播放速度"), `speed1`
//! comes after `speed15`/`speed125`, and `pause`/`stop` come before `play`
//! ("一時停止", "停止播放").
//!
//! English phrases are lower-case because transcripts are lower-cased before
//! matching.

use super::action::ActionId;

// ---------------------------------------------------------------------------
// Locale
// ---------------------------------------------------------------------------

/// Locales that have built-in phrases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Locale {
    En,
    /// Traditional Chinese (zh-TW, zh-HK).
    ZhHant,
    /// Simplified Chinese (zh-CN, zh-SG).
    ZhHans,
    Ja,
}

impl Locale {
    /// Map a BCP-47 tag to the phrase locale it selects.
    ///
    /// ```
    /// use voice_player::commands::Locale;
    ///
    /// assert_eq!(Locale::from_tag("en-US"), Some(Locale::En));
    /// assert_eq!(Locale::from_tag("zh-TW"), Some(Locale::ZhHant));
    /// assert_eq!(Locale::from_tag("zh_CN"), Some(Locale::ZhHans));
    /// assert_eq!(Locale::from_tag("fr-FR"), None);
    /// ```
    pub fn from_tag(tag: &str) -> Option<Locale> {
        let tag = tag.trim().replace('_', "-").to_ascii_lowercase();
        let mut parts = tag.split('-');
        let lang = parts.next().unwrap_or_default();
        let rest: Vec<&str> = parts.collect();

        match lang {
            "en" => Some(Locale::En),
            "ja" => Some(Locale::Ja),
            "zh" => {
                let traditional = rest
                    .iter()
                    .any(|p| matches!(*p, "hant" | "tw" | "hk" | "mo"));
                Some(if traditional {
                    Locale::ZhHant
                } else {
                    Locale::ZhHans
                })
            }
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Table types
// ---------------------------------------------------------------------------

/// One trigger phrase and the locale it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phrase {
    pub locale: Locale,
    pub text: &'static str,
}

/// All trigger phrases for one action.
#[derive(Debug)]
pub struct PhraseEntry {
    pub action: ActionId,
    pub phrases: &'static [Phrase],
}

const fn en(text: &'static str) -> Phrase {
    Phrase { locale: Locale::En, text }
}

const fn zt(text: &'static str) -> Phrase {
    Phrase { locale: Locale::ZhHant, text }
}

const fn zs(text: &'static str) -> Phrase {
    Phrase { locale: Locale::ZhHans, text }
}

const fn ja(text: &'static str) -> Phrase {
    Phrase { locale: Locale::Ja, text }
}

// ---------------------------------------------------------------------------
// PHRASE_TABLE
// ---------------------------------------------------------------------------

/// Built-in phrase table in match order.
pub static PHRASE_TABLE: &[PhraseEntry] = &[
    PhraseEntry {
        action: ActionId::Unmute,
        phrases: &[
            en("unmute"),
            en("sound on"),
            en("turn on the sound"),
            zt("取消靜音"),
            zt("打開聲音"),
            zs("取消静音"),
            zs("打开声音"),
            ja("ミュート解除"),
        ],
    },
    PhraseEntry {
        action: ActionId::Mute,
        phrases: &[
            en("mute"),
            en("sound off"),
            en("silence"),
            zt("靜音"),
            zs("静音"),
            ja("ミュート"),
            ja("消音"),
        ],
    },
    PhraseEntry {
        action: ActionId::ExitFullscreen,
        phrases: &[
            en("exit fullscreen"),
            en("exit full screen"),
            en("leave full screen"),
            en("close full screen"),
            zt("退出全螢幕"),
            zt("離開全螢幕"),
            zs("退出全屏"),
            ja("全画面解除"),
            ja("全画面終了"),
        ],
    },
    PhraseEntry {
        action: ActionId::Fullscreen,
        phrases: &[
            en("fullscreen"),
            en("full screen"),
            zt("全螢幕"),
            zs("全屏"),
            ja("全画面"),
        ],
    },
    PhraseEntry {
        action: ActionId::Speed125,
        phrases: &[
            en("speed 1.25"),
            en("1.25x"),
            en("1.25 times"),
            zt("1.25倍速"),
            zt("一點二五倍"),
            zs("一点二五倍"),
            ja("1.25倍"),
        ],
    },
    PhraseEntry {
        action: ActionId::Speed15,
        phrases: &[
            en("speed 1.5"),
            en("1.5x"),
            en("one and a half speed"),
            zt("1.5倍速"),
            zt("一點五倍"),
            zs("一点五倍"),
            ja("1.5倍"),
        ],
    },
    PhraseEntry {
        action: ActionId::Speed075,
        phrases: &[
            en("speed 0.75"),
            en("0.75x"),
            zt("0.75倍速"),
            zt("零點七五倍"),
            zs("零点七五倍"),
            ja("0.75倍"),
        ],
    },
    PhraseEntry {
        action: ActionId::Speed05,
        phrases: &[
            en("speed 0.5"),
            en("0.5x"),
            en("half speed"),
            zt("0.5倍速"),
            zt("半速"),
            zs("慢速"),
            ja("0.5倍"),
        ],
    },
    PhraseEntry {
        action: ActionId::Speed2,
        phrases: &[
            en("speed 2"),
            en("2x"),
            en("double speed"),
            en("twice as fast"),
            zt("2倍速"),
            zt("兩倍速"),
            zs("两倍速"),
            ja("2倍速"),
        ],
    },
    PhraseEntry {
        action: ActionId::Speed1,
        phrases: &[
            en("normal speed"),
            en("regular speed"),
            en("speed 1"),
            en("1x"),
            zt("正常速度"),
            zt("1倍速"),
            zs("原速"),
            ja("通常速度"),
            ja("等速"),
        ],
    },
    PhraseEntry {
        action: ActionId::Pause,
        phrases: &[
            en("pause"),
            en("hold on"),
            en("wait"),
            zt("暫停"),
            zs("暂停"),
            ja("一時停止"),
        ],
    },
    PhraseEntry {
        action: ActionId::Stop,
        phrases: &[
            en("stop"),
            en("end the video"),
            zt("停止"),
            zs("停止"),
            ja("停止"),
        ],
    },
    PhraseEntry {
        action: ActionId::Play,
        phrases: &[
            en("play"),
            en("resume"),
            en("continue"),
            en("start"),
            zt("播放"),
            zt("繼續"),
            zs("继续"),
            ja("再生"),
        ],
    },
    PhraseEntry {
        action: ActionId::Forward60,
        phrases: &[
            en("forward 60"),
            en("forward one minute"),
            en("forward a minute"),
            en("skip a minute"),
            zt("快進一分鐘"),
            zt("快轉一分鐘"),
            zs("快进一分钟"),
            ja("1分進む"),
            ja("一分進む"),
        ],
    },
    PhraseEntry {
        action: ActionId::Forward30,
        phrases: &[
            en("forward 30"),
            en("forward thirty"),
            en("skip 30"),
            zt("快進30秒"),
            zt("快進三十秒"),
            zs("快进30秒"),
            zs("快进三十秒"),
            ja("30秒進む"),
            ja("30秒早送り"),
        ],
    },
    PhraseEntry {
        action: ActionId::Forward5,
        phrases: &[
            en("forward 5"),
            en("forward five"),
            zt("快進5秒"),
            zt("快進五秒"),
            zs("快进5秒"),
            zs("快进五秒"),
            ja("5秒進む"),
        ],
    },
    PhraseEntry {
        action: ActionId::Forward10,
        phrases: &[
            en("forward 10"),
            en("forward ten"),
            en("fast forward"),
            en("skip ahead"),
            en("go forward"),
            zt("快進10秒"),
            zt("快進"),
            zt("快轉"),
            zs("快进10秒"),
            zs("快进"),
            ja("10秒進む"),
            ja("早送り"),
        ],
    },
    PhraseEntry {
        action: ActionId::Backward60,
        phrases: &[
            en("back 60"),
            en("rewind 60"),
            en("back one minute"),
            en("back a minute"),
            en("rewind a minute"),
            zt("倒退一分鐘"),
            zt("後退一分鐘"),
            zs("后退一分钟"),
            ja("1分戻る"),
            ja("一分戻る"),
        ],
    },
    PhraseEntry {
        action: ActionId::Backward30,
        phrases: &[
            en("back 30"),
            en("rewind 30"),
            en("back thirty"),
            zt("倒退30秒"),
            zt("倒退三十秒"),
            zs("后退30秒"),
            zs("后退三十秒"),
            ja("30秒戻る"),
        ],
    },
    PhraseEntry {
        action: ActionId::Backward5,
        phrases: &[
            en("back 5"),
            en("rewind 5"),
            en("back five"),
            zt("倒退5秒"),
            zt("倒退五秒"),
            zs("后退5秒"),
            zs("后退五秒"),
            ja("5秒戻る"),
        ],
    },
    PhraseEntry {
        action: ActionId::Backward10,
        phrases: &[
            en("back 10"),
            en("back ten"),
            en("rewind"),
            en("go back"),
            zt("倒退10秒"),
            zt("倒退"),
            zt("後退"),
            zs("后退10秒"),
            zs("后退"),
            ja("10秒戻る"),
            ja("巻き戻し"),
        ],
    },
    PhraseEntry {
        action: ActionId::VolumeUp,
        phrases: &[
            en("volume up"),
            en("louder"),
            en("turn it up"),
            en("increase volume"),
            en("increase the volume"),
            zt("音量調高"),
            zt("調高音量"),
            zt("大聲一點"),
            zs("音量调高"),
            zs("调高音量"),
            zs("大声一点"),
            ja("音量を上げ"),
            ja("音量アップ"),
        ],
    },
    PhraseEntry {
        action: ActionId::VolumeDown,
        phrases: &[
            en("volume down"),
            en("quieter"),
            en("turn it down"),
            en("lower the volume"),
            en("decrease volume"),
            en("decrease the volume"),
            zt("音量調低"),
            zt("調低音量"),
            zt("小聲一點"),
            zs("音量调低"),
            zs("调低音量"),
            zs("小声一点"),
            ja("音量を下げ"),
            ja("音量ダウン"),
        ],
    },
    PhraseEntry {
        action: ActionId::Bookmark,
        phrases: &[
            en("bookmark"),
            en("save this moment"),
            en("mark this"),
            zt("書籤"),
            zt("加入書籤"),
            zs("书签"),
            ja("ブックマーク"),
        ],
    },
    PhraseEntry {
        action: ActionId::Favorite,
        phrases: &[
            en("favorite"),
            en("favourite"),
            en("add to favorites"),
            zt("收藏"),
            zt("我的最愛"),
            zs("我的最爱"),
            ja("お気に入り"),
        ],
    },
];
