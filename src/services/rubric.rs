use std::fmt;

use serde::Serialize;

/// The two Gaokao English writing tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum EssayType {
    ApplicationLetter,
    ContinuationWriting,
}

/// How a raw form value was mapped onto an [`EssayType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EssayTypeMatch {
    Recognized(EssayType),
    /// Nothing matched; the continuation-writing rubric is used.
    Fallback,
}

impl EssayType {
    /// Used when the submitted type is missing or unrecognized.
    pub(crate) const FALLBACK: EssayType = EssayType::ContinuationWriting;

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            EssayType::ApplicationLetter => "application-letter",
            EssayType::ContinuationWriting => "continuation-writing",
        }
    }

    /// Accepts canonical ids and the labels the authoring page sends.
    pub(crate) fn classify(raw: Option<&str>) -> EssayTypeMatch {
        let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
            return EssayTypeMatch::Fallback;
        };
        let lowered = raw.to_lowercase();

        if lowered == "application-letter"
            || raw.contains("应用文")
            || lowered.contains("application")
        {
            return EssayTypeMatch::Recognized(EssayType::ApplicationLetter);
        }

        if lowered == "continuation-writing"
            || raw.contains("续写")
            || lowered.contains("continuation")
        {
            return EssayTypeMatch::Recognized(EssayType::ContinuationWriting);
        }

        EssayTypeMatch::Fallback
    }
}

impl EssayTypeMatch {
    pub(crate) fn essay_type(self) -> EssayType {
        match self {
            EssayTypeMatch::Recognized(essay_type) => essay_type,
            EssayTypeMatch::Fallback => EssayType::FALLBACK,
        }
    }
}

impl fmt::Display for EssayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub(crate) struct Dimension {
    pub(crate) name: &'static str,
    pub(crate) english: &'static str,
    pub(crate) max_score: u32,
}

#[derive(Debug)]
pub(crate) struct Band {
    pub(crate) level: &'static str,
    pub(crate) min_score: u32,
    pub(crate) max_score: u32,
    pub(crate) label: &'static str,
    pub(crate) requirements: &'static str,
}

#[derive(Debug)]
pub(crate) struct RubricTemplate {
    pub(crate) essay_type: EssayType,
    pub(crate) task_name: &'static str,
    pub(crate) topic_heading: &'static str,
    pub(crate) max_score: u32,
    pub(crate) dimensions: &'static [Dimension],
    pub(crate) bands: &'static [Band],
    pub(crate) criterion_note: Option<&'static str>,
}

impl RubricTemplate {
    /// The band table exactly as it appears in grading prompts.
    pub(crate) fn band_table(&self) -> String {
        let mut table = format!("[Grading Rubric - Max {} Points]\n", self.max_score);
        table.push_str("| 档次 | 分数段 | 等级 | 核心要求 |\n|---|---|---|---|\n");
        for band in self.bands {
            table.push_str(&format!(
                "| {} | {}-{}分 | {} | {} |\n",
                band.level, band.min_score, band.max_score, band.label, band.requirements
            ));
        }
        table
    }

    pub(crate) fn dimension_list(&self) -> String {
        let mut list = format!("[Core Dimensions - Scale to {} Total]\n", self.max_score);
        for (index, dimension) in self.dimensions.iter().enumerate() {
            list.push_str(&format!(
                "{}. {} ({}) - max {} points\n",
                index + 1,
                dimension.name,
                dimension.english,
                dimension.max_score
            ));
        }
        list
    }
}

/// Returns the built-in scoring framework for `essay_type`. Templates are
/// `'static` and shared by every request.
pub(crate) fn select_rubric(essay_type: EssayType) -> &'static RubricTemplate {
    match essay_type {
        EssayType::ApplicationLetter => &APPLICATION_LETTER,
        EssayType::ContinuationWriting => &CONTINUATION_WRITING,
    }
}

static APPLICATION_LETTER: RubricTemplate = RubricTemplate {
    essay_type: EssayType::ApplicationLetter,
    task_name: "Practical Writing (应用文)",
    topic_heading: "Topic",
    max_score: 15,
    dimensions: &[
        Dimension { name: "内容要点", english: "Content Coverage", max_score: 5 },
        Dimension { name: "语言质量", english: "Language Quality", max_score: 5 },
        Dimension { name: "篇章结构", english: "Structure", max_score: 3 },
        Dimension { name: "交际效果", english: "Communication", max_score: 2 },
    ],
    bands: &[
        Band {
            level: "第五档",
            min_score: 13,
            max_score: 15,
            label: "优秀",
            requirements: "1. 内容：覆盖所有要点，内容充实。 2. 语言：词汇丰富、准确，语法结构多样，错误极少。 3. 结构：条理清晰，衔接自然，格式完全正确。 4. 交际：语气恰当，完全达到写作目的。",
        },
        Band {
            level: "第四档",
            min_score: 10,
            max_score: 12,
            label: "良好",
            requirements: "1. 内容：覆盖所有要点，内容较充实。 2. 语言：词汇和语法能满足任务要求，有少量错误。 3. 结构：结构较清晰，格式正确。 4. 交际：语气恰当，较好地达到写作目的。",
        },
        Band {
            level: "第三档",
            min_score: 7,
            max_score: 9,
            label: "中等",
            requirements: "1. 内容：遗漏1-2个次要点，内容基本完整。 2. 语言：词汇和语法基本正确，错误不影响理解。 3. 结构：结构尚可，格式有少量错误。 4. 交际：语气基本恰当，基本达到写作目的。",
        },
        Band {
            level: "第二档",
            min_score: 4,
            max_score: 6,
            label: "较差",
            requirements: "1. 内容：遗漏部分要点，内容单薄。 2. 语言：词汇有限，语法错误较多，影响理解。 3. 结构：结构不清，格式错误较多。 4. 交际：语气不当，未能完全达到写作目的。",
        },
        Band {
            level: "第一档",
            min_score: 1,
            max_score: 3,
            label: "差",
            requirements: "1. 内容：遗漏主要内容或离题。 2. 语言：错误很多，难以理解。 3. 结构：结构混乱，格式不清。 4. 交际：未能达到写作目的。",
        },
    ],
    criterion_note: Some(
        "Coverage is the passing criterion: every content point required by the topic must be addressed, and the letter format (salutation, body, closing, signature) must be complete.",
    ),
};

static CONTINUATION_WRITING: RubricTemplate = RubricTemplate {
    essay_type: EssayType::ContinuationWriting,
    task_name: "Continuation Writing (读后续写)",
    topic_heading: "Topic / Context",
    max_score: 25,
    dimensions: &[
        Dimension { name: "内容创造", english: "Content Creativity", max_score: 7 },
        Dimension { name: "语言能力", english: "Language Ability", max_score: 8 },
        Dimension { name: "篇章结构", english: "Structure", max_score: 5 },
        Dimension { name: "协同程度", english: "Synergy", max_score: 5 },
    ],
    bands: &[
        Band {
            level: "第五档",
            min_score: 21,
            max_score: 25,
            label: "优秀",
            requirements: "1. 内容：与原文高度融合，情节丰富合理，结局自然且有创意。 2. 语言：词汇丰富高级，语法结构复杂多样，语言风格与原文一致。 3. 结构：衔接流畅，段落结构严谨。 4. 协同：能使用原文的关键词、情境或细节进行巧妙呼应。",
        },
        Band {
            level: "第四档",
            min_score: 16,
            max_score: 20,
            label: "良好",
            requirements: "1. 内容：与原文融合较好，情节合理、完整。 2. 语言：词汇较丰富，语法结构有一定变化，风格与原文基本一致。 3. 结构：衔接较流畅。 4. 协同：能使用原文的某些关键元素进行延续。",
        },
        Band {
            level: "第三档",
            min_score: 11,
            max_score: 15,
            label: "中等",
            requirements: "1. 内容：创造了基本合理的情节，但可能略显平淡或衔接生硬。 2. 语言：词汇和语法基本满足任务，有一些错误。 3. 结构：衔接尚可。 4. 协同：与原文有一定的关联。",
        },
        Band {
            level: "第二档",
            min_score: 6,
            max_score: 10,
            label: "较差",
            requirements: "1. 内容：情节不合理、不完整或与原文脱节。 2. 语言：词汇贫乏，语法错误多，影响理解。 3. 结构：衔接生硬。 4. 协同：与原文关联微弱。",
        },
        Band {
            level: "第一档",
            min_score: 1,
            max_score: 5,
            label: "差",
            requirements: "1. 内容：情节混乱或严重偏离原文。 2. 语言：错误很多，难以理解。 3. 结构：无有效衔接。 4. 协同：几乎未体现与原文的关联。",
        },
    ],
    criterion_note: Some(
        "Synergy (协同性) is the core criterion: the continuation must match the original passage in plot, characters, tone, style and language.",
    ),
};
