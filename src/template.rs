use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of contract kinds. Exactly one active template per kind is
/// resolvable at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractKind {
    Advertising,
    Consulting,
}

impl ContractKind {
    pub const ALL: [ContractKind; 2] = [ContractKind::Advertising, ContractKind::Consulting];

    pub fn as_str(self) -> &'static str {
        match self {
            ContractKind::Advertising => "advertising",
            ContractKind::Consulting => "consulting",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ContractKind::Advertising => "広告運用代行契約書",
            ContractKind::Consulting => "内製化支援・コンサル契約書",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractSection {
    pub id: String,
    /// Display label derived from position ("第N条"). Recomputed on every
    /// structural change, never stored independently of order.
    pub number: String,
    pub title: String,
    pub content: String,
    #[serde(rename = "isEditable")]
    pub is_editable: bool,
}

impl ContractSection {
    pub fn new(id: &str, title: &str, content: &str, is_editable: bool) -> Self {
        Self {
            id: id.to_string(),
            number: String::new(),
            title: title.to_string(),
            content: content.to_string(),
            is_editable,
        }
    }
}

pub fn section_number(position: usize) -> String {
    format!("第{}条", position)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractTemplate {
    pub id: String,
    pub name: String,
    pub kind: ContractKind,
    pub title: String,
    pub preamble: String,
    pub sections: Vec<ContractSection>,
    pub conclusion: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl ContractTemplate {
    /// Renumbers sections densely 1..N in current order.
    pub fn renumber(&mut self) {
        for (index, section) in self.sections.iter_mut().enumerate() {
            section.number = section_number(index + 1);
        }
    }

    pub fn push_section(&mut self, section: ContractSection) {
        self.sections.push(section);
        self.renumber();
    }

    pub fn insert_section(&mut self, index: usize, section: ContractSection) {
        let index = index.min(self.sections.len());
        self.sections.insert(index, section);
        self.renumber();
    }

    pub fn remove_section(&mut self, id: &str) -> bool {
        let before = self.sections.len();
        self.sections.retain(|section| section.id != id);
        let removed = self.sections.len() != before;
        if removed {
            self.renumber();
        }
        removed
    }

    /// Swaps the section at `index` with its neighbour. Out-of-range moves
    /// are ignored.
    pub fn move_section(&mut self, index: usize, direction: MoveDirection) {
        let target = match direction {
            MoveDirection::Up => {
                if index == 0 || index >= self.sections.len() {
                    return;
                }
                index - 1
            }
            MoveDirection::Down => {
                if index + 1 >= self.sections.len() {
                    return;
                }
                index + 1
            }
        };
        self.sections.swap(index, target);
        self.renumber();
    }

    pub fn new_custom_section() -> ContractSection {
        ContractSection {
            id: format!("custom-{}", Uuid::new_v4()),
            number: String::new(),
            title: "新しい条項".to_string(),
            content: "条項の内容を入力してください".to_string(),
            is_editable: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

/// Built-in default: type-specific sections followed by the sections every
/// contract kind shares, renumbered in final order. The id is freshly
/// generated so reseeding within one process run never collides.
pub fn default_template(kind: ContractKind) -> ContractTemplate {
    let now = Utc::now();
    let mut sections = type_sections(kind);
    sections.extend(common_sections());
    let mut template = ContractTemplate {
        id: format!("default-{}-{}", kind.as_str(), Uuid::new_v4()),
        name: kind.label().to_string(),
        kind,
        title: "業務委託契約書".to_string(),
        preamble: "{customerName}（以下「甲」という。）と{companyName}（以下「乙」という。）とは、\
                   次の通り業務委託契約（以下「本契約」という。）を締結する。"
            .to_string(),
        sections,
        conclusion: "本契約締結の証として本契約書２通を作成し、甲乙双方が各自署名又は記名押印の上、\
                     それぞれ１通を保有する。"
            .to_string(),
        created_at: now,
        updated_at: now,
    };
    template.renumber();
    template
}

fn type_sections(kind: ContractKind) -> Vec<ContractSection> {
    match kind {
        ContractKind::Advertising => vec![
            ContractSection::new(
                "ad-scope",
                "委託業務",
                "１　甲は、乙に対し、以下の業務（以下、「本業務」という。）を委託し、乙はこれを受託する。\n\
                 （１）甲が指定するウェブサイト、ホームページ（以下「本件サイト」という）のWEB広告の管理および運用業務\n\
                 （２）前項のWEB広告に係るレポート等の作成業務\n\
                 （３）本件サイトのコンセプトに沿う他のウェブサイトまたはランディングページ等の提案業務\n\
                 （４）前各号に付随するバナー制作業務\n\
                 ２　乙による本業務の遂行に要する広告掲載費用その他に係る予算について、乙は甲に対しあらかじめ通知しなければならない。",
                true,
            ),
            ContractSection::new(
                "ad-term",
                "契約期間",
                "甲が本業務を乙に委託する期間は、{startDate}から{endDate}までの{period}カ月間とする。\
                 ただし、毎月月末までにいずれの当事者から何らの意思表示がなされない場合、\
                 同じ条件でさらに１カ月間更新されるものとし、その後も同様とする。",
                true,
            ),
            ContractSection::new(
                "ad-fee",
                "委託料",
                "１　甲は、乙に対し、本業務の委託料として、以下に定める金額を支払うものとする。\
                 なお、すべての算定にあたり消費税を含むものとする。\n\
                 （１）広告運用代行の場合、金{amount}円（税抜）/月額\n\
                 ２　甲は前項に定める委託料を毎月月末までに乙の指定する銀行口座に振り込む方法によって支払う。\
                 なお、振込手数料は甲の負担とする。",
                true,
            ),
        ],
        ContractKind::Consulting => vec![
            ContractSection::new(
                "cs-scope",
                "委託業務",
                "１　甲は、乙に対し、以下の業務（以下、「本業務」という。）を委託し、乙はこれを受託する。\n\
                 （１）甲が指定するウェブサイト、ホームページ、SNS、CRM（以下「本件サイト」という）のWEB広告の管理および集客サポート\n\
                 ２　乙による本業務の遂行に要する広告掲載費用その他に係る予算について、乙は甲に対しあらかじめ通知しなければならない。",
                true,
            ),
            ContractSection::new(
                "cs-term",
                "契約期間",
                "甲が本業務を乙に委託する期間は、{startDate}から{endDate}までの{period}カ月間とする。",
                true,
            ),
            ContractSection::new(
                "cs-fee",
                "委託料",
                "１　甲は、乙に対し、本業務の委託料として、以下に定める金額を支払うものとする。\
                 なお、すべての算定にあたり消費税を含むものとする。また、支払いは3回払いの分割払いとする。\n\
                 （１）Meta広告コンサル費用　金{amount}円（税込）\n\
                 ２　甲は前項に定める委託料を乙の指定する銀行口座に振り込む方法によって支払う。\
                 なお、振込手数料は甲の負担とする。",
                true,
            ),
        ],
    }
}

fn common_sections() -> Vec<ContractSection> {
    vec![
        ContractSection::new(
            "common-cost",
            "費用",
            "１　広告掲載費用については、甲が直接各広告媒体の事業者に直接甲のクレジットカードにより支払うものとする。\n\
             ２　乙の故意または重過失により、広告掲載費が増加した場合を除き、広告掲載費の一切は甲が負担するものとする。\n\
             ３　乙は、本業務の履行に要する費用が別途発生する場合は、甲に予め承諾を得たうえで、\
             合理的に必要な範囲で甲に請求することができるものとする。",
            true,
        ),
        ContractSection::new(
            "common-subcontract",
            "再委託",
            "乙は本業務の一部又は全部を、乙の責任と監督のもと第三者に再委託することができるものとする。",
            true,
        ),
        ContractSection::new(
            "common-copyright",
            "著作権の取扱い",
            "１　本業務の遂行過程において成果物（以下、「本成果物」という。）が発生した場合、\
             本成果物の著作権（著作権法第２７条および第２８条の権利を含む。以下同じ。）は、乙に帰属するものとする。\
             ただし、乙は甲に対して、本成果物を使用するのに必要な限度で著作物の利用を許諾する。\n\
             ２　甲は、乙に対し、本業務遂行に必要な範囲で甲の著作物（写真・動画・文章等）を無償にて使用することを許諾し、\
             また、著作者人格権の主張をしないことを確認する。",
            true,
        ),
        ContractSection::new(
            "common-confidentiality",
            "秘密保持",
            "甲及び乙は、本契約の内容及び存在、相手方の個人情報ならびに本業務の履行に関して相手方より開示された\
             一切の情報（以下、「秘密情報」という）を秘密として保持するものとし、相手方の書面による事前の同意なく\
             第三者に開示し、漏洩し、又は本契約を履行する目的以外に使用してはならない。",
            true,
        ),
        ContractSection::new(
            "common-damages",
            "損害賠償",
            "甲又は乙は、相手方の責めに帰すべき事由により自己に損害が生じたときは、相手方に対し、\
             直接かつ通常の範囲の損害の賠償を請求することができるものとする。\
             但し乙の負担する損害額の上限は、本業務による甲からの委託料の累計額とする。",
            true,
        ),
        ContractSection::new(
            "common-termination",
            "解除",
            "甲及び乙は、相手方が破産手続開始、民事再生手続開始、会社更生手続開始、特別清算開始の申し立てを受け、\
             又は相手方が本契約の各条項に違反し相当期間を定めた催告にもかかわらず是正しないときは、\
             催告その他の手続きを要することなく、直ちに契約を解除する事ができる。",
            true,
        ),
        ContractSection::new(
            "common-law",
            "準拠法・裁判管轄",
            "１　契約の準拠法は日本法とし、本契約は日本法に従い解釈される。\n\
             ２　本契約に関する一切の紛争は、東京地方裁判所を第一審の専属的合意管轄裁判所とする。",
            false,
        ),
        ContractSection::new(
            "common-consultation",
            "協議",
            "甲及び乙は、本契約に定めのない事項が生じたとき、又は本契約の条項の解釈について疑義が生じたときは、\
             誠意をもって協議し、円満に解決を図るものとする。",
            false,
        ),
    ]
}

/// Section count of a freshly seeded default, per kind.
pub fn default_section_count(kind: ContractKind) -> usize {
    type_sections(kind).len() + common_sections().len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_templates_are_densely_numbered() {
        for kind in ContractKind::ALL {
            let template = default_template(kind);
            assert_eq!(template.sections.len(), default_section_count(kind));
            for (index, section) in template.sections.iter().enumerate() {
                assert_eq!(section.number, format!("第{}条", index + 1));
            }
        }
    }

    #[test]
    fn seeded_ids_never_collide_within_a_process() {
        let first = default_template(ContractKind::Advertising);
        let second = default_template(ContractKind::Advertising);
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn structural_edits_renumber_as_a_side_effect() {
        let mut template = default_template(ContractKind::Consulting);
        let original_len = template.sections.len();

        template.insert_section(1, ContractSection::new("extra", "追加条項", "内容", true));
        assert_eq!(template.sections[1].number, "第2条");
        assert_eq!(template.sections[2].number, "第3条");

        template.move_section(1, MoveDirection::Down);
        assert_eq!(template.sections[1].id, "cs-term");
        assert_eq!(template.sections[2].id, "extra");
        assert_eq!(template.sections[2].number, "第3条");

        assert!(template.remove_section("extra"));
        assert_eq!(template.sections.len(), original_len);
        for (index, section) in template.sections.iter().enumerate() {
            assert_eq!(section.number, section_number(index + 1));
        }
    }

    #[test]
    fn renumbering_holds_for_random_edit_sequences() {
        // Sequences of length 0..10 over insert/delete/swap, checked after
        // every step.
        let mut template = default_template(ContractKind::Advertising);
        let ops: [u8; 10] = [0, 1, 2, 0, 2, 1, 0, 0, 2, 1];
        for (step, op) in ops.iter().enumerate() {
            match op {
                0 => {
                    let section =
                        ContractSection::new(&format!("gen-{}", step), "条項", "本文", true);
                    template.insert_section(step % (template.sections.len() + 1), section);
                }
                1 => {
                    if let Some(id) = template.sections.first().map(|s| s.id.clone()) {
                        template.remove_section(&id);
                    }
                }
                _ => {
                    template.move_section(step % template.sections.len().max(1), MoveDirection::Up);
                }
            }
            for (index, section) in template.sections.iter().enumerate() {
                assert_eq!(section.number, format!("第{}条", index + 1));
            }
        }
    }

    #[test]
    fn out_of_range_moves_are_ignored() {
        let mut template = default_template(ContractKind::Advertising);
        let snapshot = template.sections.clone();
        template.move_section(0, MoveDirection::Up);
        let last = template.sections.len() - 1;
        template.move_section(last, MoveDirection::Down);
        assert_eq!(template.sections, snapshot);
    }

    #[test]
    fn template_serializes_timestamps_as_iso8601() {
        let template = default_template(ContractKind::Advertising);
        let json = serde_json::to_string(&template).unwrap();
        assert!(json.contains("createdAt"));
        let revived: ContractTemplate = serde_json::from_str(&json).unwrap();
        assert_eq!(revived.created_at, template.created_at);
        assert_eq!(revived.kind, ContractKind::Advertising);
    }
}
