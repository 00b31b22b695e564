//! The bundled introspection script. Materialized once into the workspace
//! and invoked via `tsx`, same mechanism as `executeScript`, so that "every
//! signature extraction goes through this single program" holds within one
//! Node process per call.

pub fn introspect_ts() -> &'static str {
    r#"import ts from "typescript";
import { createRequire } from "node:module";
import path from "node:path";

const nodeRequire = createRequire(import.meta.url);

function resolveClientDeclarationFile() {
  const pkgJsonPath = nodeRequire.resolve("@datocms/cma-client-node/package.json");
  const pkgDir = path.dirname(pkgJsonPath);
  const pkgJson = nodeRequire(pkgJsonPath);
  const typesEntry = pkgJson.types ?? pkgJson.typings ?? "dist/types/index.d.ts";
  return path.join(pkgDir, typesEntry);
}

function buildProgram() {
  const entry = resolveClientDeclarationFile();
  const options: ts.CompilerOptions = {
    noEmit: true,
    skipLibCheck: true,
    strict: false,
    moduleResolution: ts.ModuleResolutionKind.NodeNext,
    module: ts.ModuleKind.NodeNext,
    allowJs: false,
  };
  const program = ts.createProgram([entry], options);
  const checker = program.getTypeChecker();
  return { program, checker, entry };
}

function findClientClass(program: ts.Program): ts.ClassDeclaration {
  for (const sourceFile of program.getSourceFiles()) {
    if (program.isSourceFileFromExternalLibrary(sourceFile)) continue;
    let found: ts.ClassDeclaration | undefined;
    const visit = (node: ts.Node) => {
      if (ts.isClassDeclaration(node) && node.name?.text === "Client") {
        found = node;
        return;
      }
      ts.forEachChild(node, visit);
    };
    ts.forEachChild(sourceFile, visit);
    if (found) return found;
  }
  throw new Error("could not locate class declaration 'Client' in the installed client package");
}

function isLibFile(fileName: string): boolean {
  return fileName.includes("/typescript/lib/") || fileName.endsWith(".d.ts") === false;
}

function isOwnPackageFile(fileName: string): boolean {
  return fileName.includes("@datocms/cma-client") || fileName.includes("@datocms/cma-client-node");
}

function qualifiedNameOf(symbol: ts.Symbol, checker: ts.TypeChecker): string {
  return checker.getFullyQualifiedName(symbol);
}

function declarationFileOf(symbol: ts.Symbol): string | undefined {
  const decl = symbol.declarations?.[0];
  return decl?.getSourceFile().fileName;
}

function symbolId(symbol: ts.Symbol, checker: ts.TypeChecker): string {
  const file = declarationFileOf(symbol) ?? "<unknown>";
  return `${file}::${qualifiedNameOf(symbol, checker)}`;
}

const PRIMITIVE_FLAGS =
  ts.TypeFlags.String |
  ts.TypeFlags.Number |
  ts.TypeFlags.Boolean |
  ts.TypeFlags.Void |
  ts.TypeFlags.Undefined |
  ts.TypeFlags.Null |
  ts.TypeFlags.Never |
  ts.TypeFlags.Any |
  ts.TypeFlags.Unknown |
  ts.TypeFlags.BigInt |
  ts.TypeFlags.ESSymbol |
  ts.TypeFlags.StringLiteral |
  ts.TypeFlags.NumberLiteral |
  ts.TypeFlags.BooleanLiteral;

/** Walks a type structurally (unions, intersections, generic type arguments) and
 * records every named, non-primitive, non-lib symbol it finds. Does not
 * descend into object member types -- only the shapes `4.5`/`4.6` name. */
function collectReferencedTypes(
  type: ts.Type,
  checker: ts.TypeChecker,
  seen: Set<string>,
  out: Map<string, { name: string; symbol: string }>
) {
  if (type.flags & PRIMITIVE_FLAGS) return;

  if (type.isUnionOrIntersection()) {
    for (const member of type.types) collectReferencedTypes(member, checker, seen, out);
    return;
  }

  const symbol = type.aliasSymbol ?? type.getSymbol();
  if (symbol && symbol.declarations?.length) {
    const file = declarationFileOf(symbol);
    if (file && !isLibFile(file)) {
      const id = symbolId(symbol, checker);
      if (!seen.has(id)) {
        seen.add(id);
        out.set(id, { name: symbol.name, symbol: id });
      }
    }
  }

  const typeArguments = (type as ts.TypeReference).typeArguments;
  if (typeArguments) {
    for (const arg of typeArguments) collectReferencedTypes(arg, checker, seen, out);
  }
}

function parseActionUrl(doc: string | undefined): string | undefined {
  if (!doc) return undefined;
  const match = doc.match(/Read more:\s*(\S+)/);
  return match?.[1];
}

function extractSignature(resource: string, method: string) {
  const { program, checker } = buildProgram();
  const clientClass = findClientClass(program);
  const clientType = checker.getTypeAtLocation(clientClass);

  const resourceProp = checker.getPropertyOfType(clientType, resource);
  if (!resourceProp) return undefined;
  const resourceType = checker.getTypeOfSymbolAtLocation(resourceProp, clientClass);

  const methodProp = checker.getPropertyOfType(resourceType, method);
  if (!methodProp) return undefined;
  const methodType = checker.getTypeOfSymbolAtLocation(methodProp, clientClass);

  const callSignatures = methodType.getCallSignatures();
  if (callSignatures.length === 0) return undefined;

  const seen = new Set<string>();
  const referenced = new Map<string, { name: string; symbol: string }>();
  let actionUrl: string | undefined;

  const overloads = callSignatures.map((signature) => {
    const parameters = signature.getParameters().map((param) => {
      const paramType = checker.getTypeOfSymbolAtLocation(param, clientClass);
      collectReferencedTypes(paramType, checker, seen, referenced);
      const decl = param.declarations?.[0] as ts.ParameterDeclaration | undefined;
      const isOptional = Boolean(decl?.questionToken) || Boolean(decl?.initializer);
      const doc = ts.displayPartsToString(param.getDocumentationComment(checker)) || undefined;
      return { name: param.name, type: checker.typeToString(paramType), isOptional, doc };
    });

    const returnType = signature.getReturnType();
    collectReferencedTypes(returnType, checker, seen, referenced);

    const docParts = signature.getDocumentationComment(checker);
    const doc = ts.displayPartsToString(docParts) || undefined;
    if (!actionUrl) actionUrl = parseActionUrl(doc);

    return {
      parameters,
      returnType: checker.typeToString(returnType),
      doc,
    };
  });

  const [primary, ...rest] = overloads;
  return {
    methodName: method,
    parameters: primary.parameters,
    returnType: primary.returnType,
    doc: primary.doc,
    actionUrl,
    referencedTypeSymbols: Array.from(referenced.values()).map((r) => ({ name: r.name, symbol: r.symbol })),
    overloads: rest,
  };
}

function stripLeadingComments(text: string): string {
  return text.replace(/^(\s*\/\*[\s\S]*?\*\/\s*|\s*\/\/.*\n)+/, "").trimStart();
}

function findDeclarationForSymbolId(program: ts.Program, checker: ts.TypeChecker, id: string) {
  const [file, qualifiedName] = id.split("::");
  const sourceFile = program.getSourceFile(file);
  if (!sourceFile) return undefined;

  const parts = qualifiedName.includes(".") ? qualifiedName.split(".") : [qualifiedName];
  let scopeSymbol: ts.Symbol | undefined;
  let symbols = checker.getSymbolsInScope(sourceFile, ts.SymbolFlags.Type | ts.SymbolFlags.Value | ts.SymbolFlags.Namespace);

  for (const part of parts) {
    const match = (scopeSymbol
      ? checker.getExportsOfModule(scopeSymbol)
      : symbols
    ).find((s) => s.name === part || s.name.endsWith(`.${part}`));
    if (!match) return undefined;
    scopeSymbol = match;
  }

  return scopeSymbol?.declarations?.[0];
}

function expandTypes(seeds: { name: string; symbol: string }[], maxDepth: number, expandNames: string[] | "*" | null) {
  const { program, checker } = buildProgram();

  let roots = seeds;
  if (expandNames && expandNames !== "*" && expandNames.length > 0) {
    roots = seeds.filter((s) => expandNames.includes(s.name));
  }

  const minDepthSeen = new Map<string, number>();
  const emitted: string[] = [];
  const emittedIds = new Set<string>();
  const deferred = new Set<string>();
  const unlimited = expandNames === "*";

  const visit = (seed: { name: string; symbol: string }, depth: number) => {
    const priorDepth = minDepthSeen.get(seed.symbol);
    if (priorDepth !== undefined && priorDepth <= depth) return;
    minDepthSeen.set(seed.symbol, depth);

    const decl = findDeclarationForSymbolId(program, checker, seed.symbol);
    if (!decl) return;
    const file = decl.getSourceFile().fileName;
    if (!isOwnPackageFile(file)) return;

    const atCap = !unlimited && depth >= maxDepth;

    if (!atCap) {
      deferred.delete(seed.symbol);
      if (!emittedIds.has(seed.symbol)) {
        emittedIds.add(seed.symbol);
        emitted.push(stripLeadingComments(decl.getFullText(decl.getSourceFile())));
      }
    } else if (!emittedIds.has(seed.symbol)) {
      deferred.add(seed.name);
    }

    const declaredType = checker.getTypeAtLocation(decl);
    const seen = new Set<string>();
    const next = new Map<string, { name: string; symbol: string }>();
    collectReferencedTypes(declaredType, checker, seen, next);
    for (const ref of next.values()) {
      visit(ref, atCap ? depth : depth + 1);
    }
  };

  for (const seed of roots) visit(seed, 0);

  return {
    expandedTypes: emitted.join("\n\n"),
    notExpandedTypes: Array.from(deferred.values()),
  };
}

async function readStdin(): Promise<string> {
  const chunks: Buffer[] = [];
  for await (const chunk of process.stdin) chunks.push(chunk as Buffer);
  return Buffer.concat(chunks).toString("utf8");
}

async function main() {
  const raw = await readStdin();
  const request = JSON.parse(raw);

  try {
    if (request.command === "signature") {
      const signature = extractSignature(request.resource, request.method);
      process.stdout.write(JSON.stringify({ status: "signature", signature: signature ?? null }));
      return;
    }

    if (request.command === "expand") {
      const expandTypesOption = request.options?.expandTypes ?? null;
      const result = expandTypes(request.seeds, request.options?.maxDepth ?? 2, expandTypesOption);
      process.stdout.write(JSON.stringify({ status: "expand", result }));
      return;
    }

    process.stdout.write(JSON.stringify({ status: "error", message: `unknown command: ${request.command}` }));
  } catch (err) {
    process.stdout.write(
      JSON.stringify({ status: "error", message: err instanceof Error ? err.message : String(err) })
    );
  }
}

main();
"#
}
