use indoc::indoc;

use loc_tags::patterns::{column_containing, LINE};
use loc_tags::{lit, Query, TagRef, Tagger};

const INVOICE: &str = indoc! {"
    item     qty  price
    apple    3    1.20
    peach    13   0.50
"};

fn invoice() -> Tagger {
    let mut tagger = Tagger::new(INVOICE, true);
    let quantities = column_containing(INVOICE, "qty").unwrap();
    tagger.tag_list("qty", &quantities);
    tagger.tag_re("line", LINE, 1, false).unwrap();
    tagger.tag_re("fruit", "apple|peach", 0, false).unwrap();
    tagger
}

fn texts(tagger: &Tagger, rows: &[Vec<loc_tags::Loc>]) -> Vec<Vec<String>> {
    let mut texts: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            tagger
                .get_text_tuple(row)
                .into_iter()
                .map(str::to_string)
                .collect()
        })
        .collect();
    texts.sort();
    texts
}

#[test]
fn quantity_column() {
    let tagger = invoice();
    assert_eq!(tagger.get_text_tag("qty").unwrap(), vec!["qty", "3", "13"]);
}

#[test]
fn fruit_with_quantity_on_the_same_line() {
    let tagger = invoice();
    let tags: Vec<TagRef> = vec!["fruit".into(), "qty".into(), "line".into()];
    let mut query = Query::new(&tags, "subinterval(0,2) and subinterval(1,2)", &tagger)
        .project(&[0, 1])
        .unwrap();
    let rows = query.execute().unwrap();
    assert_eq!(
        texts(&tagger, &rows),
        vec![vec!["apple", "3"], vec!["peach", "13"]]
    );
}

#[test]
fn literals_and_distances() {
    let tagger = invoice();
    let tags: Vec<TagRef> = vec!["fruit".into(), lit("13")];
    let rows = Query::new(&tags, "before(0,1)", &tagger).execute().unwrap();
    assert_eq!(
        texts(&tagger, &rows),
        vec![vec!["apple", "13"], vec!["peach", "13"]]
    );

    let tags: Vec<TagRef> = vec!["fruit".into(), "qty".into()];
    let rows = Query::new(&tags, "dist(0,1) <= 4 or meets(1,0)", &tagger)
        .execute()
        .unwrap();
    assert_eq!(
        texts(&tagger, &rows),
        vec![vec!["apple", "3"], vec!["peach", "13"]]
    );
}

#[test]
fn untagged_text_and_replacement() {
    let tagger = invoice();
    let gaps = tagger
        .not_in(&["fruit".into(), "qty".into(), lit("item"), lit("price")], None)
        .unwrap();
    let words: Vec<&str> = tagger
        .get_text_list(&gaps)
        .into_iter()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect();
    assert_eq!(words, vec!["1.20", "0.50"]);

    let replaced = tagger.replace_tag("fruit", "?").unwrap();
    assert_eq!(
        replaced,
        indoc! {"
            item     qty  price
            ?    3    1.20
            ?    13   0.50
        "}
    );
}

#[test]
fn query_errors_carry_codes() {
    let tagger = invoice();
    let tags: Vec<TagRef> = vec!["fruit".into()];
    let mut query = Query::new(&tags, "follows(0,0)", &tagger);
    assert_eq!(query.execute().unwrap_err().code(), 110613);
    let mut query = Query::new(&tags, "before(0,1", &tagger);
    assert_eq!(query.execute().unwrap_err().code(), 110610);
}
