//! Browser globals known to the script service.

pub struct GlobalData {
    pub name: &'static str,
    /// Declaration shown on hover.
    pub declaration: &'static str,
    pub is_class: bool,
}

const fn global(name: &'static str, declaration: &'static str, is_class: bool) -> GlobalData {
    GlobalData {
        name,
        declaration,
        is_class,
    }
}

/// Sorted by name.
pub static GLOBALS: &[GlobalData] = &[
    global("Array", "var Array: ArrayConstructor", true),
    global("Date", "var Date: DateConstructor", true),
    global("Error", "var Error: ErrorConstructor", true),
    global("JSON", "var JSON: JSON", false),
    global("Map", "var Map: MapConstructor", true),
    global("Math", "var Math: Math", false),
    global("Number", "var Number: NumberConstructor", true),
    global("Object", "var Object: ObjectConstructor", true),
    global("Promise", "var Promise: PromiseConstructor", true),
    global("Set", "var Set: SetConstructor", true),
    global("String", "var String: StringConstructor", true),
    global("alert", "function alert(message?: any): void", false),
    global("clearTimeout", "function clearTimeout(id: number | undefined): void", false),
    global("console", "var console: Console", false),
    global("document", "var document: Document", false),
    global(
        "fetch",
        "function fetch(input: RequestInfo | URL, init?: RequestInit): Promise<Response>",
        false,
    ),
    global("localStorage", "var localStorage: Storage", false),
    global("parseFloat", "function parseFloat(string: string): number", false),
    global("parseInt", "function parseInt(string: string, radix?: number): number", false),
    global(
        "setInterval",
        "function setInterval(handler: TimerHandler, timeout?: number): number",
        false,
    ),
    global(
        "setTimeout",
        "function setTimeout(handler: TimerHandler, timeout?: number): number",
        false,
    ),
    global("window", "var window: Window & typeof globalThis", false),
];

/// Members of global objects as (object, member, signature).
pub static MEMBERS: &[(&str, &str, &str)] = &[
    ("JSON", "parse", "parse(text: string, reviver?: Function): any"),
    (
        "JSON",
        "stringify",
        "stringify(value: any, replacer?: Function, space?: string | number): string",
    ),
    ("Math", "abs", "abs(x: number): number"),
    ("Math", "ceil", "ceil(x: number): number"),
    ("Math", "floor", "floor(x: number): number"),
    ("Math", "max", "max(...values: number[]): number"),
    ("Math", "min", "min(...values: number[]): number"),
    ("Math", "random", "random(): number"),
    ("Math", "round", "round(x: number): number"),
    ("Object", "assign", "assign(target: object, ...sources: any[]): any"),
    ("Object", "entries", "entries(o: object): [string, any][]"),
    ("Object", "keys", "keys(o: object): string[]"),
    ("Object", "values", "values(o: object): any[]"),
    ("console", "error", "error(...data: any[]): void"),
    ("console", "info", "info(...data: any[]): void"),
    ("console", "log", "log(...data: any[]): void"),
    ("console", "warn", "warn(...data: any[]): void"),
    (
        "document",
        "addEventListener",
        "addEventListener(type: string, listener: EventListener, options?: boolean): void",
    ),
    (
        "document",
        "createElement",
        "createElement(tagName: string, options?: ElementCreationOptions): HTMLElement",
    ),
    ("document", "getElementById", "getElementById(elementId: string): HTMLElement | null"),
    ("document", "querySelector", "querySelector(selectors: string): Element | null"),
    ("document", "querySelectorAll", "querySelectorAll(selectors: string): NodeList"),
    ("localStorage", "getItem", "getItem(key: string): string | null"),
    ("localStorage", "removeItem", "removeItem(key: string): void"),
    ("localStorage", "setItem", "setItem(key: string, value: string): void"),
    (
        "window",
        "addEventListener",
        "addEventListener(type: string, listener: EventListener, options?: boolean): void",
    ),
    ("window", "alert", "alert(message?: any): void"),
    (
        "window",
        "requestAnimationFrame",
        "requestAnimationFrame(callback: FrameRequestCallback): number",
    ),
];

pub fn global_data(name: &str) -> Option<&'static GlobalData> {
    GLOBALS
        .binary_search_by(|g| g.name.cmp(name))
        .ok()
        .map(|i| &GLOBALS[i])
}

pub fn members(
    object: &str,
) -> impl Iterator<Item = &'static (&'static str, &'static str, &'static str)> + '_ {
    MEMBERS.iter().filter(move |(o, ..)| *o == object)
}

pub fn member(object: &str, name: &str) -> Option<&'static str> {
    members(object)
        .find(|(_, m, _)| *m == name)
        .map(|(.., signature)| *signature)
}

/// Parameter labels of a signature such as `f(a: T, b?: U): R`.
pub fn parameters(signature: &str) -> Vec<String> {
    let Some(open) = signature.find('(') else {
        return Vec::new();
    };
    let mut depth = 0usize;
    let mut current = String::new();
    let mut out = Vec::new();
    for c in signature[open + 1..].chars() {
        match c {
            '(' | '[' | '<' => depth += 1,
            ')' if depth == 0 => break,
            ')' | ']' | '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                out.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    if !current.trim().is_empty() {
        out.push(current.trim().to_string());
    }
    out
}
