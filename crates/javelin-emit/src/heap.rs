//! Target heap policy.
//!
//! The flattener asks a [`HeapModel`] for allocation-function names and
//! for how globals are declared. The model also decides the
//! forward-reference policy: a plain C target declares a prototype first
//! and lets initializers point at globals declared later, while a
//! portable (C++-syntax) target forbids that, so reference slots are
//! initialized to zero and patched by deferred assignment statements run
//! at startup.

/// Rendering and allocation policy for the target heap.
#[derive(Debug, Default)]
pub struct HeapModel {
    use_gc: bool,
    portable: bool,
    initializers: Vec<String>,
}

impl HeapModel {
    /// Plain C target: prototypes plus mutual references in initializers.
    pub fn new() -> Self {
        HeapModel::default()
    }

    /// Portable target: zero placeholders plus deferred assignments.
    pub fn portable() -> Self {
        HeapModel { portable: true, ..HeapModel::default() }
    }

    pub fn with_gc(mut self, gc: bool) -> Self {
        self.use_gc = gc;
        self
    }

    /// Allocator for memory blocks that never hold pointers.
    pub fn malloc(&self) -> &'static str {
        if self.use_gc { "GC_malloc_atomic" } else { "malloc" }
    }

    pub fn calloc(&self) -> &'static str {
        if self.use_gc { "GC_calloc_obj" } else { "calloc" }
    }

    pub fn free(&self) -> &'static str {
        if self.use_gc { "GC_free" } else { "free" }
    }

    /// True if global initializers may not reference other globals.
    pub fn portable_initialization(&self) -> bool {
        self.portable
    }

    /// Prototype declaration of a global, with trailing newline.
    pub fn prototype_code(&self, type_name: &str, gvar: &str) -> String {
        format!("static {type_name} {gvar};\n")
    }

    /// Declaration of a global, without the trailing semicolon.
    pub fn declaration_code(&self, type_name: &str, gvar: &str) -> String {
        format!("static {type_name} {gvar}")
    }

    /// Queues a statement for the startup initializer.
    pub fn add_initializer(&mut self, code: String) {
        self.initializers.push(code);
    }

    /// The queued startup statements, in the order they were added.
    pub fn initializer_code(&self) -> String {
        self.initializers.concat()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_names_follow_gc_choice() {
        let plain = HeapModel::new();
        assert_eq!(plain.malloc(), "malloc");
        assert_eq!(plain.calloc(), "calloc");
        let gc = HeapModel::new().with_gc(true);
        assert_eq!(gc.malloc(), "GC_malloc_atomic");
        assert_eq!(gc.free(), "GC_free");
    }

    #[test]
    fn declaration_forms() {
        let heap = HeapModel::new();
        assert_eq!(heap.prototype_code("struct A_4", "gvar0"), "static struct A_4 gvar0;\n");
        assert_eq!(heap.declaration_code("int", "gvar1"), "static int gvar1");
    }

    #[test]
    fn initializers_keep_insertion_order() {
        let mut heap = HeapModel::portable();
        assert!(heap.portable_initialization());
        heap.add_initializer("gvar0.next_0 = &gvar1;\n".to_string());
        heap.add_initializer("gvar1[1] = gvar2;\n".to_string());
        assert_eq!(
            heap.initializer_code(),
            "gvar0.next_0 = &gvar1;\ngvar1[1] = gvar2;\n"
        );
    }
}
