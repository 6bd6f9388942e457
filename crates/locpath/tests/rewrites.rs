use std::cell::Cell;

use locpath::compiler::lower;
use locpath::data::{Data, MemData, NameId, NodeKind, Pre};
use locpath::index::ValueIndex;
use locpath::{CompileContext, CompileOptions, EvalContext, Expr, NodeSet, compile_query, parse_query};
use rstest::{fixture, rstest};

/// Forwards to a `MemData` and counts structural accesses.
struct Counting {
    inner: MemData,
    hits: Cell<usize>,
}

impl Counting {
    fn new(inner: MemData) -> Self {
        Self {
            inner,
            hits: Cell::new(0),
        }
    }

    fn touch(&self) {
        self.hits.set(self.hits.get() + 1);
    }
}

impl Data for Counting {
    fn len(&self) -> usize {
        self.inner.len()
    }
    fn kind(&self, pre: Pre) -> NodeKind {
        self.touch();
        self.inner.kind(pre)
    }
    fn size(&self, pre: Pre, kind: NodeKind) -> usize {
        self.touch();
        self.inner.size(pre, kind)
    }
    fn att_size(&self, pre: Pre, kind: NodeKind) -> usize {
        self.touch();
        self.inner.att_size(pre, kind)
    }
    fn parent(&self, pre: Pre, kind: NodeKind) -> Option<Pre> {
        self.touch();
        self.inner.parent(pre, kind)
    }
    fn name(&self, pre: Pre, kind: NodeKind) -> Option<NameId> {
        self.touch();
        self.inner.name(pre, kind)
    }
    fn name_id(&self, name: &str) -> Option<NameId> {
        self.inner.name_id(name)
    }
    fn name_of(&self, id: NameId) -> &str {
        self.inner.name_of(id)
    }
    fn value(&self, pre: Pre, kind: NodeKind) -> &str {
        self.touch();
        self.inner.value(pre, kind)
    }
    fn is_leaf(&self, name: NameId) -> bool {
        self.inner.is_leaf(name)
    }
    fn version(&self) -> u64 {
        self.inner.version()
    }
    fn index(&self) -> Option<&dyn ValueIndex> {
        self.inner.index()
    }
}

#[fixture]
fn doc() -> MemData {
    MemData::from_xml(
        r#"<r>
             <a><b>1</b><c><b>2</b><b>3</b></c></a>
             <b>4</b>
             <a><c/></a>
           </r>"#,
    )
    .unwrap()
}

fn compiled(data: &dyn Data, query: &str) -> String {
    let cctx = CompileContext::new(data);
    let q = compile_query(query, &cctx).unwrap();
    q.as_path().expect("a path").to_string()
}

fn eval(data: &dyn Data, query: &str) -> NodeSet {
    let q = compile_query(query, &CompileContext::new(data)).unwrap();
    q.eval_nodes(&EvalContext::new(data)).unwrap()
}

fn eval_uncompiled(data: &dyn Data, query: &str) -> NodeSet {
    let Expr::Path(path) = lower(parse_query(query).unwrap()).unwrap() else {
        panic!("{query} is not a path");
    };
    path.eval(&EvalContext::new(data), &NodeSet::single(0)).unwrap()
}

#[rstest]
#[case("./a/.", "child::a")]
#[case(".", "self::node()")]
#[case("self::node()/self::node()", "self::node()")]
#[case("a/self::node()[1]", "child::a/self::node()[1]")]
#[case("/.", "/self::node()")]
fn self_steps_merge(doc: MemData, #[case] query: &str, #[case] expected: &str) {
    assert_eq!(compiled(&doc, query), expected);
}

#[rstest]
#[case("//b", "/descendant::b")]
#[case("//a//b", "/descendant::a/descendant::b")]
#[case("//b[1]", "/descendant-or-self::node()/child::b[1]")]
#[case("//b[last()]", "/descendant-or-self::node()/child::b[last()]")]
#[case("//@id", "/descendant-or-self::node()/attribute::id")]
#[case("a//c/b", "child::a/descendant::c/child::b")]
fn descendant_steps_merge(#[case] query: &str, #[case] expected: &str) {
    let d = MemData::from_xml("<r id='1'><a><c><b>x</b></c></a></r>").unwrap();
    assert_eq!(compiled(&d, query), expected);
}

#[rstest]
#[case("//b")]
#[case("//b[1]")]
#[case("//c//b")]
#[case("//c/b[2]")]
#[case("//a[c/b]//b")]
#[case("/r//b[. = '4']")]
#[case("//node()")]
#[case("//text()")]
fn merged_paths_select_the_same_nodes(doc: MemData, #[case] query: &str) {
    assert_eq!(eval(&doc, query), eval_uncompiled(&doc, query), "{query}");
}

#[rstest]
#[case("//missing")]
#[case("/r/a/missing/b")]
#[case("//b[2.5]")]
#[case("/r/a[0]/c")]
fn empty_paths_never_touch_the_document(doc: MemData, #[case] query: &str) {
    let data = Counting::new(doc);
    let q = compile_query(query, &CompileContext::new(&data)).unwrap();
    assert!(q.as_path().unwrap().is_empty_plan(), "{query}");
    data.hits.set(0);
    let got = q.eval_nodes(&EvalContext::new(&data)).unwrap();
    assert!(got.is_empty());
    assert_eq!(data.hits.get(), 0, "{query} touched the document");
}

#[rstest]
fn leaf_operand_becomes_text_step(doc: MemData) {
    let opts = CompileOptions::builder().with_index(false).build();
    let cctx = CompileContext::new(&doc).with_options(opts);
    let q = compile_query("//b[. = '3']", &cctx).unwrap();
    assert_eq!(q.as_path().unwrap().to_string(), "/descendant::b[child::text() = '3']");

    // `c` elements are not leaves: one has element children, one is empty
    let q = compile_query("//c[. = '23']", &cctx).unwrap();
    assert_eq!(q.as_path().unwrap().to_string(), "/descendant::c[self::node() = '23']");

    // only operands opposite a literal are rewritten
    let q = compile_query("//b[. = ../b]", &cctx).unwrap();
    assert_eq!(
        q.as_path().unwrap().to_string(),
        "/descendant::b[self::node() = parent::node()/child::b]"
    );
    assert_eq!(eval(&doc, "//b[. = '3']"), eval_uncompiled(&doc, "//b[. = '3']"));
}

#[test]
fn compiling_a_path_needs_a_document() {
    let err = compile_query("//b", &CompileContext::without_data()).unwrap_err();
    assert_eq!(err.code, locpath::ErrorCode::XPDY0002);
    let q = compile_query("1 + 2", &CompileContext::without_data()).unwrap();
    assert_eq!(q.source(), "1 + 2");
}

#[rstest]
#[case("/r/b[1]", false)]
#[case("/r/b[position() < 3]", false)]
#[case("/r/b[@x][1]", false)]
#[case("/r/b[last()]", true)]
fn position_ranges_stop_scanning(#[case] query: &str, #[case] scans_all: bool) {
    let xml = format!("<r>{}</r>", "<b x=\"1\"/>".repeat(1000));
    let data = Counting::new(MemData::from_xml(&xml).unwrap());
    let opts = CompileOptions::builder().with_index(false).build();
    let q = compile_query(query, &CompileContext::new(&data).with_options(opts)).unwrap();
    data.hits.set(0);
    let got = q.eval_nodes(&EvalContext::new(&data)).unwrap();
    assert!(!got.is_empty(), "{query}");
    if scans_all {
        assert!(data.hits.get() > 1000, "{query} touched {} nodes", data.hits.get());
    } else {
        assert!(data.hits.get() < 50, "{query} touched {} nodes", data.hits.get());
    }
}
